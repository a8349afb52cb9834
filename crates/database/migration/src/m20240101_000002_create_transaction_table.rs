use super::m20240101_000001_create_batch_table::Batch;
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BatchTransaction::Table)
                    .if_not_exists()
                    .col(pk_auto(BatchTransaction::Id))
                    .col(binary_len(BatchTransaction::Hash, 32))
                    .col(big_integer(BatchTransaction::BatchNumber))
                    .col(big_integer(BatchTransaction::L2BlockNumber))
                    .col(integer(BatchTransaction::Position))
                    .col(binary(BatchTransaction::Encoded))
                    .col(small_integer(BatchTransaction::EffectivePercentage))
                    .col(integer(BatchTransaction::RomError))
                    .col(binary_len(BatchTransaction::StateRoot, 32))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_batch_transaction_batch_number")
                            .from(BatchTransaction::Table, BatchTransaction::BatchNumber)
                            .to(Batch::Table, Batch::BatchNumber)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_batch_transaction_batch_number")
                    .col(BatchTransaction::BatchNumber)
                    .table(BatchTransaction::Table)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(BatchTransaction::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum BatchTransaction {
    Table,
    Id,
    Hash,
    BatchNumber,
    L2BlockNumber,
    Position,
    Encoded,
    EffectivePercentage,
    RomError,
    StateRoot,
}
