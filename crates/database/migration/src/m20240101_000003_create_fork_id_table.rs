use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ForkId::Table)
                    .if_not_exists()
                    .col(big_integer(ForkId::ForkId).primary_key())
                    .col(big_integer(ForkId::FromBatchNumber))
                    .col(big_integer(ForkId::ToBatchNumber))
                    .col(text(ForkId::Version))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ForkId::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ForkId {
    Table,
    ForkId,
    FromBatchNumber,
    ToBatchNumber,
    Version,
}
