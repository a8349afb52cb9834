use rollup_node_primitives::{ForkId, ForkIdInterval};
use sea_orm::{entity::prelude::*, ActiveValue};

/// A database model that represents the batch interval of a fork.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "fork_id")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    fork_id: i64,
    pub(crate) from_batch_number: i64,
    to_batch_number: i64,
    version: String,
}

/// The relation for the fork id model.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

/// The active model behavior for the fork id model.
impl ActiveModelBehavior for ActiveModel {}

// An open ended interval is persisted with an upper bound of `i64::MAX`.
const fn to_column(value: u64) -> i64 {
    if value > i64::MAX as u64 {
        i64::MAX
    } else {
        value as i64
    }
}

const fn from_column(value: i64) -> u64 {
    if value == i64::MAX {
        u64::MAX
    } else {
        value as u64
    }
}

impl From<ForkIdInterval> for ActiveModel {
    fn from(interval: ForkIdInterval) -> Self {
        Self {
            fork_id: ActiveValue::Set(interval.fork_id.id() as i64),
            from_batch_number: ActiveValue::Set(to_column(interval.from_batch_number)),
            to_batch_number: ActiveValue::Set(to_column(interval.to_batch_number)),
            version: ActiveValue::Set(interval.version),
        }
    }
}

impl From<Model> for ForkIdInterval {
    fn from(value: Model) -> Self {
        Self {
            fork_id: ForkId(value.fork_id as u64),
            from_batch_number: from_column(value.from_batch_number),
            to_batch_number: from_column(value.to_batch_number),
            version: value.version,
        }
    }
}
