use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    tracing::info!(target: "zkevm::migration", "Running database migrations.");
    cli::run_cli(zkevm_migration::Migrator).await;
    tracing::info!(target: "zkevm::migration", "Database migrations complete.")
}
