//! Unit of work.
//!
//! Every multi-row mutation runs inside one [`UnitOfWork`]: repositories are
//! built over [`UnitOfWork::conn`] and the outcome is handed to
//! [`UnitOfWork::finish`], which commits on `Ok` and rolls back on `Err`.
//! A unit of work dropped without `finish` is rolled back by the driver.

use huddle_common::AppResult;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tracing::warn;

use crate::db_err;

/// An open transaction scope.
pub struct UnitOfWork {
    txn: DatabaseTransaction,
}

impl UnitOfWork {
    /// Begin a new transaction.
    pub async fn begin(db: &DatabaseConnection) -> AppResult<Self> {
        let txn = db.begin().await.map_err(db_err)?;
        Ok(Self { txn })
    }

    /// Connection to run statements on.
    #[must_use]
    pub const fn conn(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Commit when `result` is `Ok`, roll back otherwise, and pass `result` through.
    pub async fn finish<T>(self, result: AppResult<T>) -> AppResult<T> {
        match result {
            Ok(value) => {
                self.txn.commit().await.map_err(db_err)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.txn.rollback().await {
                    warn!(error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}
