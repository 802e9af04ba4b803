//! Application state for dependency injection.

use entity_access::{Database, EntityStore};

use crate::entities::UserEntity;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub users: EntityStore<UserEntity>,
}

impl AppState {
    /// Create new app state.
    pub fn new(database: Database) -> Self {
        let users = EntityStore::from_database(&database);
        Self { database, users }
    }
}
