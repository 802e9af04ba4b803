//! Shared fixtures: an `accounts` entity on a fresh in-memory SQLite database.

#![allow(dead_code)]

use sea_orm::{ConnectionTrait, Schema, Set};

use common::DatabaseConfig;
use entity_access::{Database, EntityStore};

pub mod account {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "accounts")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        #[sea_orm(unique)]
        pub email: String,
        pub name: String,
        pub bio: Option<String>,
        pub display_name: Option<String>,
        pub age: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub type Accounts = EntityStore<account::Entity>;

/// Connect to a new in-memory database with the `accounts` table created.
pub async fn setup() -> (Database, Accounts) {
    let database = Database::connect(&DatabaseConfig::in_memory_sqlite())
        .await
        .expect("in-memory database");

    let db = database.connection();
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    db.execute(backend.build(&schema.create_table_from_entity(account::Entity)))
        .await
        .expect("create accounts table");

    let accounts = EntityStore::from_database(&database);
    (database, accounts)
}

pub fn new_account(email: &str, name: &str) -> account::ActiveModel {
    account::ActiveModel {
        email: Set(email.to_string()),
        name: Set(name.to_string()),
        bio: Set(None),
        display_name: Set(None),
        age: Set(30),
        ..Default::default()
    }
}
