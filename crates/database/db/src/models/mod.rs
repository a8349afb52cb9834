/// This module contains the batch database model.
pub mod batch;

/// This module contains the batch transaction database model.
pub mod batch_transaction;

/// This module contains the fork id database model.
pub mod fork_id;

use crate::DatabaseError;
use alloy_primitives::{Address, B256};

/// Reads a [`B256`] out of a persisted column.
pub(crate) fn b256(column: &'static str, value: &[u8]) -> Result<B256, DatabaseError> {
    B256::try_from(value).map_err(|_| DatabaseError::InvalidData { column, len: value.len() })
}

/// Reads an [`Address`] out of a persisted column.
pub(crate) fn address(column: &'static str, value: &[u8]) -> Result<Address, DatabaseError> {
    Address::try_from(value).map_err(|_| DatabaseError::InvalidData { column, len: value.len() })
}
