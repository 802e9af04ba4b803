//! Partial attribute updates.
//!
//! # Rules
//! - Excluded fields are dropped before anything else happens, whether
//!   named by column or by an alias the column accepts.
//! - Keys that are not columns are skipped with a warning, or rejected in
//!   strict mode.
//! - Primary key columns are never rewritten (same skip/strict handling).
//! - `null` leaves the attribute unchanged.
//! - A value of the wrong type for its column is always rejected.
//!
//! Values are merged into the serialized form of the current row and the
//! result is deserialized back into a model, so the model's serde field
//! names must match its column names.

use std::str::FromStr;

use sea_orm::{
    ActiveModelTrait, EntityTrait, IdenStatic, IntoActiveModel, Iterable, ModelTrait,
    PrimaryKeyToColumn,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value as JsonValue};

use common::{AppError, AppResult};

use crate::entity_name;

/// A set of attribute changes for `EntityStore::update`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    values: Map<String, JsonValue>,
    excluded: Vec<String>,
    strict: bool,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a patch from any serializable value, typically a request body.
    ///
    /// The value must serialize to a JSON object.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> AppResult<Self> {
        Self::from_json(serde_json::to_value(value)?)
    }

    pub fn from_json(value: JsonValue) -> AppResult<Self> {
        match value {
            JsonValue::Object(values) => Ok(Self {
                values,
                ..Self::default()
            }),
            other => Err(AppError::validation(format!(
                "Update data must be an object, got {}",
                other
            ))),
        }
    }

    /// Set one attribute.
    pub fn set(mut self, attribute: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.values.insert(attribute.into(), value.into());
        self
    }

    /// Never apply `attribute`, even if present.
    pub fn exclude(mut self, attribute: impl Into<String>) -> Self {
        self.excluded.push(attribute.into());
        self
    }

    /// Reject unknown attributes and primary key changes instead of skipping them.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Compute the changes this patch makes to `current`.
    ///
    /// Returns `None` when every applicable value already matches.
    pub fn apply<E>(&self, current: &E::Model) -> AppResult<Option<E::ActiveModel>>
    where
        E: EntityTrait,
        E::Model: Serialize + DeserializeOwned + IntoActiveModel<E::ActiveModel>,
        E::ActiveModel: ActiveModelTrait<Entity = E>,
        E::Column: FromStr,
    {
        let entity = entity_name::<E>();
        let primary_keys: Vec<String> = E::PrimaryKey::iter()
            .map(|key| key.into_column().as_str().to_owned())
            .collect();

        let mut document = match serde_json::to_value(current)? {
            JsonValue::Object(document) => document,
            _ => {
                return Err(AppError::internal(format!(
                    "{} does not serialize to an object",
                    entity
                )))
            }
        };

        // Column names accept aliases (`createdAt` for `created_at`), so
        // exclusions are compared on the resolved column name.
        let excluded: Vec<String> = self
            .excluded
            .iter()
            .map(|name| match E::Column::from_str(name) {
                Ok(column) => column.as_str().to_owned(),
                Err(_) => name.clone(),
            })
            .collect();

        let mut changed = Vec::new();
        for (key, value) in &self.values {
            if excluded.iter().any(|excluded| excluded == key) {
                tracing::debug!("Skipping excluded field {}.{}", entity, key);
                continue;
            }

            let column = match E::Column::from_str(key) {
                Ok(column) => column,
                Err(_) => {
                    let detail = format!("{} does not have field '{}'", entity, key);
                    self.skip_or_reject(detail)?;
                    continue;
                }
            };

            let name = column.as_str();
            if excluded.iter().any(|excluded| excluded == name) {
                tracing::debug!("Skipping excluded field {}.{}", entity, key);
                continue;
            }

            if primary_keys.iter().any(|key| key == name) {
                let detail = format!("Primary key {}.{} cannot be updated", entity, name);
                self.skip_or_reject(detail)?;
                continue;
            }

            if value.is_null() || document.get(name) == Some(value) {
                continue;
            }

            tracing::debug!("Updating {}.{} = {}", entity, name, value);
            document.insert(name.to_string(), value.clone());
            changed.push(column);
        }

        if changed.is_empty() {
            return Ok(None);
        }

        let merged: E::Model = serde_json::from_value(JsonValue::Object(document))
            .map_err(|e| AppError::validation(format!("Invalid value for {}: {}", entity, e)))?;

        let mut active: E::ActiveModel = current.clone().into_active_model();
        for column in changed {
            active.set(column, merged.get(column));
        }

        Ok(Some(active))
    }

    fn skip_or_reject(&self, detail: String) -> AppResult<()> {
        if self.strict {
            tracing::error!("{}", detail);
            return Err(AppError::validation(detail));
        }
        tracing::warn!("{}, skipping", detail);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use serde_json::json;

    #[derive(Serialize)]
    struct Rename {
        name: Option<String>,
        bio: Option<String>,
    }

    #[test]
    fn builds_from_serializable_dto() {
        let patch = Patch::from_serialize(&Rename {
            name: Some("Ann".to_string()),
            bio: None,
        })
        .unwrap();

        assert_eq!(patch.values.get("name"), Some(&json!("Ann")));
        assert_eq!(patch.values.get("bio"), Some(&JsonValue::Null));
    }

    #[test]
    fn rejects_non_object_data() {
        assert!(matches!(
            Patch::from_json(json!([1, 2])),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn builder_collects_values_and_flags() {
        let patch = Patch::new().set("name", "Ann").exclude("id").strict();
        assert!(patch.is_strict());
        assert!(!patch.is_empty());
        assert_eq!(patch.excluded, vec!["id".to_string()]);
    }
}
