//! Per-operation database sessions.
//!
//! A `Session` wraps one database transaction for the lifetime of a single
//! store operation:
//! - begun when the operation starts
//! - committed when the operation succeeds
//! - rolled back when the operation fails
//!
//! Dropping a session that was never finished rolls the transaction back,
//! so an early return or a panic never leaves a half-applied write behind.

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use common::{AppError, AppResult};

/// Unit of work scoped to one store operation.
pub struct Session {
    txn: DatabaseTransaction,
    detail: &'static str,
}

impl Session {
    /// Open a new session on the given connection.
    ///
    /// `detail` names the operation in logs, e.g. "Error finding entity by ID".
    pub async fn begin(db: &DatabaseConnection, detail: &'static str) -> AppResult<Self> {
        let txn = db.begin().await.map_err(|e| {
            let err = AppError::from(e);
            tracing::error!("{}: could not open session: {}", detail, err);
            err
        })?;

        Ok(Self { txn, detail })
    }

    /// Connection handle for queries issued inside this session.
    pub fn txn(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Release the session according to the operation's outcome.
    ///
    /// Successful outcomes are committed; a failing commit is reported like
    /// any other store error. Failed outcomes are rolled back and logged.
    pub async fn finish<T>(self, outcome: AppResult<T>) -> AppResult<T> {
        let detail = self.detail;

        match outcome {
            Ok(value) => {
                self.txn.commit().await.map_err(|e| {
                    let err = AppError::from(e);
                    log_failure(detail, &err);
                    err
                })?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.txn.rollback().await {
                    tracing::error!("{}: session rollback failed: {}", detail, rollback_err);
                }
                log_failure(detail, &err);
                Err(err)
            }
        }
    }
}

fn log_failure(detail: &str, err: &AppError) {
    match err {
        AppError::Persistence(_) | AppError::Internal(_) => tracing::error!("{}: {}", detail, err),
        AppError::Conflict(_) => tracing::info!("{}: {}", detail, err),
        AppError::NotFound(_) | AppError::Validation(_) => tracing::debug!("{}: {}", detail, err),
    }
}
