use sea_orm_migration::{prelude::*, schema::*};

const HASH_LENGTH: u32 = 32;
const ADDRESS_LENGTH: u32 = 20;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Batch::Table)
                    .if_not_exists()
                    .col(big_integer(Batch::BatchNumber).primary_key())
                    .col(binary_len(Batch::Coinbase, ADDRESS_LENGTH))
                    .col(binary_len(Batch::GlobalExitRoot, HASH_LENGTH))
                    .col(binary_len(Batch::LocalExitRoot, HASH_LENGTH))
                    .col(binary_len(Batch::StateRoot, HASH_LENGTH))
                    .col(binary_len(Batch::AccInputHash, HASH_LENGTH))
                    .col(big_integer(Batch::Timestamp))
                    .col(binary(Batch::BatchL2Data))
                    .col(big_integer_null(Batch::ForcedBatchNumber))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Batch::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Batch {
    Table,
    BatchNumber,
    Coinbase,
    GlobalExitRoot,
    LocalExitRoot,
    StateRoot,
    AccInputHash,
    Timestamp,
    BatchL2Data,
    ForcedBatchNumber,
}
