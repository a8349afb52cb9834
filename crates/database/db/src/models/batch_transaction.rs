use super::b256;
use crate::DatabaseError;

use rollup_node_primitives::{ProcessTransactionResponse, RomError};
use sea_orm::{entity::prelude::*, ActiveValue};

/// A database model that represents a transaction stored for a trusted batch.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "batch_transaction")]
pub struct Model {
    #[sea_orm(primary_key)]
    id: i32,
    hash: Vec<u8>,
    pub(crate) batch_number: i64,
    pub(crate) l2_block_number: i64,
    pub(crate) position: i32,
    encoded: Vec<u8>,
    effective_percentage: i16,
    rom_error: i32,
    state_root: Vec<u8>,
}

/// The relation for the batch transaction model.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The batch containing the transaction.
    #[sea_orm(
        belongs_to = "super::batch::Entity",
        from = "Column::BatchNumber",
        to = "super::batch::Column::BatchNumber"
    )]
    Batch,
}

impl Related<super::batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batch.def()
    }
}

/// The active model behavior for the batch transaction model.
impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    /// Returns a new [`ActiveModel`] for the transaction at `position` of the provided L2 block.
    pub(crate) fn new(
        batch_number: u64,
        l2_block_number: u64,
        position: usize,
        tx: &ProcessTransactionResponse,
    ) -> Self {
        Self {
            id: ActiveValue::NotSet,
            hash: ActiveValue::Set(tx.tx_hash.to_vec()),
            batch_number: ActiveValue::Set(batch_number as i64),
            l2_block_number: ActiveValue::Set(l2_block_number as i64),
            position: ActiveValue::Set(position as i32),
            encoded: ActiveValue::Set(tx.encoded.to_vec()),
            effective_percentage: ActiveValue::Set(tx.effective_percentage.into()),
            rom_error: ActiveValue::Set(tx.rom_error as i32),
            state_root: ActiveValue::Set(tx.state_root.to_vec()),
        }
    }
}

impl TryFrom<Model> for ProcessTransactionResponse {
    type Error = DatabaseError;

    fn try_from(value: Model) -> Result<Self, Self::Error> {
        let rom_error = RomError::try_from(value.rom_error as u32)
            .map_err(|_| DatabaseError::InvalidData { column: "rom_error", len: 4 })?;
        Ok(Self {
            tx_hash: b256("hash", &value.hash)?,
            encoded: value.encoded.into(),
            effective_percentage: value.effective_percentage as u8,
            state_root: b256("state_root", &value.state_root)?,
            rom_error,
        })
    }
}
