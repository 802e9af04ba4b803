//! User Service Library
//!
//! A REST service over the `users` table. Every handler goes through
//! `EntityStore<UserEntity>`, so store failures reach clients as the
//! normalized `AppError` outcomes (404, 409, 400, 500).

pub mod config;
pub mod entities;
pub mod handlers;
pub mod migrations;
pub mod routes;
pub mod state;

use std::collections::HashSet;
use std::net::SocketAddr;

use sea_orm::{DatabaseConnection, DbErr, EntityTrait, QueryOrder};
use sea_orm_migration::{seaql_migrations, MigrationName, MigratorTrait};
use tracing::info;

use entity_access::Database;

use crate::config::UserServiceConfig;
use crate::migrations::Migrator;
use crate::routes::create_router;
use crate::state::AppState;

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Run the HTTP server with the given configuration.
pub async fn run_server(config: UserServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let database = Database::connect(&config.database).await?;
    Migrator::up(database.connection(), None).await?;
    info!("Database connected and migrations applied");

    let app = create_router(AppState::new(database));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("User service listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(
    config: UserServiceConfig,
    action: MigrateAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let database = Database::connect(&config.database).await?;
    let db = database.connection();

    match action {
        MigrateAction::Up => {
            Migrator::up(db, None).await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            Migrator::down(db, Some(1)).await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            for (name, applied) in migration_status(db).await? {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            Migrator::fresh(db).await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// List all migrations with their applied status.
async fn migration_status(db: &DatabaseConnection) -> Result<Vec<(String, bool)>, DbErr> {
    let applied: HashSet<String> = seaql_migrations::Entity::find()
        .order_by_asc(seaql_migrations::Column::Version)
        .all(db)
        .await?
        .into_iter()
        .map(|m| m.version)
        .collect();

    Ok(Migrator::migrations()
        .iter()
        .map(|m| {
            let name = m.name().to_string();
            let is_applied = applied.contains(&name);
            (name, is_applied)
        })
        .collect())
}
