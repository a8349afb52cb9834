//! Test utilities for the database crate.

use super::Database;
use rollup_node_primitives::{Batch, ForkIdInterval};
use sea_orm::ActiveModelTrait;
use zkevm_migration::{Migrator, MigratorTrait};

/// Instantiates a new in-memory database and runs the migrations
/// to set up the schema.
pub async fn setup_test_db() -> Database {
    let database_url = "sqlite::memory:";
    let connection = sea_orm::Database::connect(database_url).await.unwrap();
    Migrator::up(&connection, None).await.unwrap();

    connection.into()
}

/// Inserts the provided batch as is, bypassing the open and close checks. Used to seed a
/// database with a genesis or pre-existing state.
pub async fn insert_batch(db: &Database, batch: Batch) {
    use crate::DatabaseConnectionProvider;

    let model = crate::models::batch::ActiveModel {
        batch_number: sea_orm::Set(batch.number as i64),
        coinbase: sea_orm::Set(batch.coinbase.to_vec()),
        global_exit_root: sea_orm::Set(batch.global_exit_root.to_vec()),
        local_exit_root: sea_orm::Set(batch.local_exit_root.to_vec()),
        state_root: sea_orm::Set(batch.state_root.to_vec()),
        acc_input_hash: sea_orm::Set(batch.acc_input_hash.to_vec()),
        timestamp: sea_orm::Set(batch.timestamp as i64),
        batch_l2_data: sea_orm::Set(batch.batch_l2_data.to_vec()),
        forced_batch_number: sea_orm::Set(batch.forced_batch_number.map(|n| n as i64)),
    };
    model.insert(db.get_connection()).await.unwrap();
}

/// Inserts a single fork covering every batch.
pub async fn insert_single_fork(db: &Database, fork_id: u64) {
    use crate::DatabaseOperations;

    db.insert_fork_id(ForkIdInterval {
        fork_id: fork_id.into(),
        from_batch_number: 0,
        to_batch_number: u64::MAX,
        version: format!("v{fork_id}"),
    })
    .await
    .unwrap();
}
