//! Database migrations.
//!
//! Schema migrations for the database. Every statement is expressible on both
//! Postgres and SQLite, so tests run the same schema in memory.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250101_000001_create_user_table;
mod m20250101_000002_create_group_table;
mod m20250101_000003_create_hierarchy_tables;
mod m20250101_000004_create_content_tables;
mod m20250101_000005_create_ranking_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_user_table::Migration),
            Box::new(m20250101_000002_create_group_table::Migration),
            Box::new(m20250101_000003_create_hierarchy_tables::Migration),
            Box::new(m20250101_000004_create_content_tables::Migration),
            Box::new(m20250101_000005_create_ranking_tables::Migration),
        ]
    }
}
