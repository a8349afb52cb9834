//! The codec for the raw transaction stream of a zkEVM batch.
//!
//! Batches sequenced before the Etrog fork carry a flat list of transactions, later batches carry
//! a list of L2 blocks, each introduced by a change L2 block marker.

pub mod decoding;
pub use decoding::{
    transaction::RawTransaction,
    v2::{BatchRawV2, L2BlockRaw},
};

pub use error::{CodecError, DecodingError, EncodingError};
mod error;

use alloy_primitives::Bytes;
use rollup_node_primitives::ForkId;

/// The codec version used for a batch's raw transaction stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Codec {
    /// Flat list of transactions, used before the Etrog fork.
    V1,
    /// List of L2 blocks, used from the Etrog fork onwards.
    V2,
}

impl Codec {
    /// Returns the codec for the provided fork.
    pub const fn from_fork(fork_id: ForkId) -> Self {
        if fork_id.is_etrog_or_later() {
            Self::V2
        } else {
            Self::V1
        }
    }

    /// Decodes the raw transaction stream of a batch belonging to the provided fork.
    pub fn decode(data: &[u8], fork_id: ForkId) -> Result<BatchL2Data, CodecError> {
        let decoded = match Self::from_fork(fork_id) {
            Self::V1 => BatchL2Data::V1(decoding::v1::decode_v1(
                data,
                fork_id.has_effective_percentage(),
            )?),
            Self::V2 => BatchL2Data::V2(decoding::v2::decode_v2(data)?),
        };
        tracing::trace!(target: "zkevm::codec", %fork_id, len = data.len(), txs = decoded.transactions_count(), "decoded batch l2 data");
        Ok(decoded)
    }
}

/// A decoded batch transaction stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchL2Data {
    /// A flat list of transactions.
    V1(Vec<RawTransaction>),
    /// A list of L2 blocks.
    V2(BatchRawV2),
}

impl BatchL2Data {
    /// Returns the number of transactions in the stream.
    pub fn transactions_count(&self) -> usize {
        match self {
            Self::V1(txs) => txs.len(),
            Self::V2(batch) => batch.transactions_count(),
        }
    }

    /// Returns an iterator over the transactions of the stream.
    pub fn transactions(&self) -> Box<dyn Iterator<Item = &RawTransaction> + '_> {
        match self {
            Self::V1(txs) => Box::new(txs.iter()),
            Self::V2(batch) => Box::new(batch.blocks.iter().flat_map(|b| b.transactions.iter())),
        }
    }

    /// Encodes the stream back into its raw form.
    pub fn encode(&self) -> Result<Bytes, CodecError> {
        Ok(match self {
            Self::V1(txs) => decoding::v1::encode_v1(txs),
            Self::V2(batch) => batch.encode()?,
        })
    }
}
