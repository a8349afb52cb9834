use super::{address, b256};
use crate::DatabaseError;

use rollup_node_primitives::{Batch, ProcessingContext};
use sea_orm::{entity::prelude::*, ActiveValue};

/// A database model that represents a trusted batch.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "batch")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub(crate) batch_number: i64,
    pub(crate) coinbase: Vec<u8>,
    pub(crate) global_exit_root: Vec<u8>,
    pub(crate) local_exit_root: Vec<u8>,
    pub(crate) state_root: Vec<u8>,
    pub(crate) acc_input_hash: Vec<u8>,
    pub(crate) timestamp: i64,
    pub(crate) batch_l2_data: Vec<u8>,
    pub(crate) forced_batch_number: Option<i64>,
}

/// The relation for the batch model.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The transactions of the batch.
    #[sea_orm(has_many = "super::batch_transaction::Entity")]
    Transactions,
}

impl Related<super::batch_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

/// The active model behavior for the batch model.
impl ActiveModelBehavior for ActiveModel {}

impl From<ProcessingContext> for ActiveModel {
    fn from(ctx: ProcessingContext) -> Self {
        let zero = alloy_primitives::B256::ZERO.to_vec();
        Self {
            batch_number: ActiveValue::Set(ctx.batch_number as i64),
            coinbase: ActiveValue::Set(ctx.coinbase.to_vec()),
            global_exit_root: ActiveValue::Set(ctx.global_exit_root.to_vec()),
            local_exit_root: ActiveValue::Set(zero.clone()),
            state_root: ActiveValue::Set(zero.clone()),
            acc_input_hash: ActiveValue::Set(zero),
            timestamp: ActiveValue::Set(ctx.timestamp as i64),
            batch_l2_data: ActiveValue::Set(ctx.batch_l2_data.to_vec()),
            forced_batch_number: ActiveValue::Set(ctx.forced_batch_number.map(|n| n as i64)),
        }
    }
}

impl TryFrom<Model> for Batch {
    type Error = DatabaseError;

    fn try_from(value: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            number: value.batch_number as u64,
            coinbase: address("coinbase", &value.coinbase)?,
            global_exit_root: b256("global_exit_root", &value.global_exit_root)?,
            local_exit_root: b256("local_exit_root", &value.local_exit_root)?,
            state_root: b256("state_root", &value.state_root)?,
            acc_input_hash: b256("acc_input_hash", &value.acc_input_hash)?,
            timestamp: value.timestamp as u64,
            batch_l2_data: value.batch_l2_data.into(),
            forced_batch_number: value.forced_batch_number.map(|n| n as u64),
        })
    }
}
