//! Decoding implementations for the batch transaction stream.

mod macros;

/// Decoding implementation for a transaction.
pub mod transaction;

/// V1 implementation of the decoding, a flat transaction list.
pub mod v1;

/// V2 implementation of the decoding, a list of L2 blocks.
pub mod v2;
