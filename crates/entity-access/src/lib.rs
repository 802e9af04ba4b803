//! Entity access layer.
//!
//! Attaches a uniform set of CRUD operations to any SeaORM entity:
//!
//! - **store**: `EntityStore<E>`, the finders and mutators
//! - **session**: one transaction per operation, committed or rolled back
//! - **criteria**: equality filters over named attributes
//! - **patch**: partial attribute updates
//! - **projection**: models as string-keyed maps
//! - **db**: connection setup
//!
//! Every failure surfaces as a `common::AppError`.
//!
//! ```ignore
//! let users = EntityStore::<user::Entity>::from_database(&database);
//! users.ensure_absent(&criteria! { email => "ann@example.com" }).await?;
//! let ann = users.save(new_user).await?;
//! let ann = users.update(&ann, &Patch::new().set("name", "Ann B.")).await?;
//! users.delete_by_id(ann.id).await?;
//! ```

pub mod criteria;
pub mod db;
pub mod pagination;
pub mod patch;
pub mod projection;
pub mod session;
pub mod store;

pub use common::{AppError, AppResult};
pub use criteria::{Criteria, Filter};
pub use db::Database;
pub use pagination::Page;
pub use patch::Patch;
pub use session::Session;
pub use store::{EntityStore, PrimaryKeyValue};

use sea_orm::EntityTrait;

/// Table name of entity `E`.
pub(crate) fn entity_name<E: EntityTrait>() -> String {
    E::default().table_name().to_string()
}
