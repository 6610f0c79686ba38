//! Test utilities for database operations.
//!
//! Provides an in-memory SQLite database with the real migrations applied.

use huddle_common::AppResult;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::{db_err, migrate};

/// Open a fresh in-memory database and migrate it.
///
/// The pool is pinned to one connection: every SQLite memory connection is its
/// own database. Code under test must therefore not touch the pool while a
/// [`UnitOfWork`](crate::UnitOfWork) is open.
pub async fn memory_db() -> AppResult<DatabaseConnection> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(opt).await.map_err(db_err)?;
    migrate(&db).await?;
    Ok(db)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{ConnectionTrait, DatabaseBackend};

    #[tokio::test]
    async fn test_memory_db_is_migrated() {
        let db = memory_db().await.unwrap();
        assert_eq!(db.get_database_backend(), DatabaseBackend::Sqlite);

        let users = crate::repositories::UserRepository::new(&db)
            .find_by_email("nobody@example.com")
            .await
            .unwrap();
        assert!(users.is_none());
    }
}
