//! Generic CRUD store attached to any SeaORM entity.
//!
//! Each method runs in its own `Session`: the transaction is committed when
//! the method returns `Ok` and rolled back when it returns `Err`, so callers
//! never observe a partial write. Store errors leave this module only as
//! `AppError` values.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::str::FromStr;

use sea_orm::sea_query::{FromValueTuple, IntoValueTuple, ValueTuple};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, PrimaryKeyTrait, QueryFilter, QuerySelect,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value as JsonValue};

use common::{AppError, AppResult, OptionExt};

use crate::criteria::Criteria;
use crate::db::Database;
use crate::entity_name;
use crate::pagination::Page;
use crate::patch::Patch;
use crate::projection;
use crate::session::Session;

/// Primary key value type of entity `E`.
pub type PrimaryKeyValue<E> = <<E as EntityTrait>::PrimaryKey as PrimaryKeyTrait>::ValueType;

/// Data access operations for entity `E`.
pub struct EntityStore<E> {
    db: DatabaseConnection,
    name: String,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for EntityStore<E> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            name: self.name.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E> Debug for EntityStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("entity", &self.name)
            .finish()
    }
}

impl<E> EntityStore<E>
where
    E: EntityTrait,
    E::Model: Serialize + DeserializeOwned + IntoActiveModel<E::ActiveModel> + Sync,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + 'static,
    E::Column: FromStr,
    PrimaryKeyValue<E>: Clone,
{
    /// Create a store over the given connection.
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            name: entity_name::<E>(),
            _entity: PhantomData,
        }
    }

    /// Create a store sharing the pool of `database`.
    pub fn from_database(database: &Database) -> Self {
        Self::new(database.get_connection())
    }

    /// Table name of the entity, used in messages.
    pub fn entity(&self) -> &str {
        &self.name
    }

    // =========================================================================
    // Class-level operations
    // =========================================================================

    /// Find the entity with primary key `id`.
    pub async fn find_by_id(&self, id: PrimaryKeyValue<E>) -> AppResult<E::Model> {
        let session = Session::begin(&self.db, "Error finding entity by ID").await?;
        let outcome: AppResult<E::Model> = async {
            let found = E::find_by_id(id.clone()).one(session.txn()).await?;
            tracing::debug!("{} found by ID {:?}: {}", self.name, id, found.is_some());
            found.ok_or_not_found(format!("{} not found with ID {:?}", self.name, id))
        }
        .await;
        session.finish(outcome).await
    }

    /// List entities in store order, windowed by `page`.
    pub async fn find_all(&self, page: Page) -> AppResult<Vec<E::Model>> {
        let session = Session::begin(&self.db, "Error finding all entities").await?;
        let outcome: AppResult<Vec<E::Model>> = async {
            let entities = E::find()
                .offset(page.offset)
                .limit(page.capped_limit())
                .all(session.txn())
                .await?;
            tracing::debug!(
                "{} found {} with offset {} and limit {}",
                self.name,
                entities.len(),
                page.offset,
                page.capped_limit()
            );
            Ok(entities)
        }
        .await;
        session.finish(outcome).await
    }

    /// All entities matching `criteria`.
    pub async fn find_by(&self, criteria: &Criteria) -> AppResult<Vec<E::Model>> {
        let session = Session::begin(&self.db, "Error finding entity by filters").await?;
        let outcome: AppResult<Vec<E::Model>> = async {
            let condition = criteria.condition::<E>()?;
            let entities = E::find().filter(condition).all(session.txn()).await?;
            tracing::debug!(
                "{} found {} with filters [{}]",
                self.name,
                entities.len(),
                criteria.describe()
            );
            Ok(entities)
        }
        .await;
        session.finish(outcome).await
    }

    /// First entity matching `criteria`, or `NotFound`.
    pub async fn find_one_by(&self, criteria: &Criteria) -> AppResult<E::Model> {
        let session = Session::begin(&self.db, "Error finding entity by filters").await?;
        let outcome: AppResult<E::Model> = async {
            let condition = criteria.condition::<E>()?;
            E::find()
                .filter(condition)
                .one(session.txn())
                .await?
                .ok_or_not_found(format!(
                    "{} with {} not found",
                    self.name,
                    criteria.describe()
                ))
        }
        .await;
        session.finish(outcome).await
    }

    /// Number of entities matching `criteria`.
    pub async fn count_by(&self, criteria: &Criteria) -> AppResult<u64> {
        let session = Session::begin(&self.db, "Error counting entities").await?;
        let outcome: AppResult<u64> = async {
            let condition = criteria.condition::<E>()?;
            Ok(E::find().filter(condition).count(session.txn()).await?)
        }
        .await;
        session.finish(outcome).await
    }

    /// Whether at least one entity matches `criteria`.
    pub async fn exists(&self, criteria: &Criteria) -> AppResult<bool> {
        let session = Session::begin(&self.db, "Error checking existence of entity").await?;
        let outcome: AppResult<bool> = async {
            let condition = criteria.condition::<E>()?;
            let found = E::find().filter(condition).one(session.txn()).await?;
            Ok(found.is_some())
        }
        .await;
        session.finish(outcome).await
    }

    /// Fail with `Conflict` if any entity matches `criteria`.
    pub async fn ensure_absent(&self, criteria: &Criteria) -> AppResult<()> {
        if self.exists(criteria).await? {
            let detail = format!("{} with {} already exists", self.name, criteria.describe());
            tracing::info!("{}", detail);
            return Err(AppError::Conflict(detail));
        }
        Ok(())
    }

    /// Fail with `NotFound` unless some entity matches `criteria`.
    pub async fn ensure_present(&self, criteria: &Criteria) -> AppResult<()> {
        if !self.exists(criteria).await? {
            let detail = format!("{} with {} not found", self.name, criteria.describe());
            tracing::info!("{}", detail);
            return Err(AppError::NotFound(detail));
        }
        Ok(())
    }

    /// Whether an entity other than `id` already matches `criteria`.
    ///
    /// Used before writes to check unique attributes against other records.
    pub async fn conflict(&self, id: PrimaryKeyValue<E>, criteria: &Criteria) -> AppResult<bool> {
        Ok(self.conflicting(id, criteria).await?.is_some())
    }

    /// Fail with `Conflict` when `conflict` would return `true`.
    pub async fn ensure_no_conflict(
        &self,
        id: PrimaryKeyValue<E>,
        criteria: &Criteria,
    ) -> AppResult<()> {
        if let Some(other) = self.conflicting(id, criteria).await? {
            let detail = format!(
                "{} with {} and different ID {:?} found",
                self.name,
                criteria.describe(),
                other
            );
            tracing::info!("{}", detail);
            return Err(AppError::Conflict(detail));
        }
        Ok(())
    }

    async fn conflicting(
        &self,
        id: PrimaryKeyValue<E>,
        criteria: &Criteria,
    ) -> AppResult<Option<ValueTuple>> {
        let session = Session::begin(&self.db, "Error checking conflicting entity").await?;
        let outcome: AppResult<Option<ValueTuple>> = async {
            let condition = criteria.condition::<E>()?;
            let own_key = id.into_value_tuple();
            let candidates = E::find().filter(condition).all(session.txn()).await?;
            let other = candidates
                .into_iter()
                .filter_map(|model| primary_key_of::<E>(&model))
                .find(|key| *key != own_key);
            Ok(other)
        }
        .await;
        session.finish(outcome).await
    }

    /// Delete the entity with primary key `id`, or fail with `NotFound`.
    pub async fn delete_by_id(&self, id: PrimaryKeyValue<E>) -> AppResult<()> {
        let session = Session::begin(&self.db, "Error deleting entity by ID").await?;
        let outcome: AppResult<()> = async {
            let result = E::delete_by_id(id.clone()).exec(session.txn()).await?;
            if result.rows_affected == 0 {
                return Err(AppError::not_found(format!(
                    "{} not found with ID {:?}",
                    self.name, id
                )));
            }
            tracing::info!("{} deleted by ID {:?}", self.name, id);
            Ok(())
        }
        .await;
        session.finish(outcome).await
    }

    /// Delete every entity matching `criteria` and return how many went.
    ///
    /// Empty criteria are rejected rather than wiping the table.
    pub async fn delete_by(&self, criteria: &Criteria) -> AppResult<u64> {
        let session = Session::begin(&self.db, "Error deleting entities by filters").await?;
        let outcome: AppResult<u64> = async {
            if criteria.is_empty() {
                return Err(AppError::validation(format!(
                    "Refusing to delete {} without filters",
                    self.name
                )));
            }
            let condition = criteria.condition::<E>()?;
            let result = E::delete_many()
                .filter(condition)
                .exec(session.txn())
                .await?;
            tracing::info!(
                "{} deleted {} with filters [{}]",
                self.name,
                result.rows_affected,
                criteria.describe()
            );
            Ok(result.rows_affected)
        }
        .await;
        session.finish(outcome).await
    }

    // =========================================================================
    // Instance-level operations
    // =========================================================================

    /// Insert a new entity and return it as stored.
    pub async fn save(&self, entity: E::ActiveModel) -> AppResult<E::Model> {
        let session = Session::begin(&self.db, "Error saving entity").await?;
        let outcome: AppResult<E::Model> = async {
            tracing::debug!("Saving {}: {:?}", self.name, entity);
            let saved = entity.insert(session.txn()).await?;
            tracing::info!("{} saved: {}", self.name, projection::describe::<E>(&saved));
            Ok(saved)
        }
        .await;
        session.finish(outcome).await
    }

    /// Apply `patch` to the stored row behind `model` and return the result.
    ///
    /// The row is re-read inside the session, so a record deleted since
    /// `model` was loaded yields `NotFound`. A patch that changes nothing
    /// issues no write.
    pub async fn update(&self, model: &E::Model, patch: &Patch) -> AppResult<E::Model> {
        let session = Session::begin(&self.db, "Error updating entity").await?;
        let outcome: AppResult<E::Model> = async {
            let key = primary_key_of::<E>(model).ok_or_else(|| {
                AppError::validation(format!("{} has no primary key value", self.name))
            })?;
            let id = <PrimaryKeyValue<E> as FromValueTuple>::from_value_tuple(key);

            let current = E::find_by_id(id.clone())
                .one(session.txn())
                .await?
                .ok_or_not_found(format!("{} not found with ID {:?}", self.name, id))?;

            match patch.apply::<E>(&current)? {
                Some(changes) => {
                    let updated = changes.update(session.txn()).await?;
                    tracing::info!(
                        "{} updated: {}",
                        self.name,
                        projection::describe::<E>(&updated)
                    );
                    Ok(updated)
                }
                None => {
                    tracing::debug!("{} ID {:?} unchanged by update", self.name, id);
                    Ok(current)
                }
            }
        }
        .await;
        session.finish(outcome).await
    }

    /// Delete the stored row behind `model`.
    pub async fn delete(&self, model: &E::Model) -> AppResult<()> {
        let session = Session::begin(&self.db, "Error deleting entity").await?;
        let outcome: AppResult<()> = async {
            let active: E::ActiveModel = model.clone().into_active_model();
            let result = active.delete(session.txn()).await?;
            if result.rows_affected == 0 {
                return Err(AppError::not_found(format!(
                    "{} no longer exists: {}",
                    self.name,
                    projection::describe::<E>(model)
                )));
            }
            tracing::info!("{} deleted: {}", self.name, projection::describe::<E>(model));
            Ok(())
        }
        .await;
        session.finish(outcome).await
    }

    /// Project `model` into a map keyed by column name.
    pub fn to_dict(&self, model: &E::Model) -> AppResult<Map<String, JsonValue>> {
        projection::to_dict::<E>(model)
    }

    /// Human-readable form of `model` for logs.
    pub fn describe(&self, model: &E::Model) -> String {
        projection::describe::<E>(model)
    }
}

/// Primary key of a loaded model.
fn primary_key_of<E>(model: &E::Model) -> Option<ValueTuple>
where
    E: EntityTrait,
    E::Model: IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelTrait<Entity = E>,
{
    let active: E::ActiveModel = model.clone().into_active_model();
    active.get_primary_key_value()
}
