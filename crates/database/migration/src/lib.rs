//! The schema migrations of the trusted state database.

pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_batch_table;
mod m20240101_000002_create_transaction_table;
mod m20240101_000003_create_fork_id_table;

/// The migrator for the trusted state database.
#[derive(Debug)]
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_batch_table::Migration),
            Box::new(m20240101_000002_create_transaction_table::Migration),
            Box::new(m20240101_000003_create_fork_id_table::Migration),
        ]
    }
}
