//! The crate exposes the external services consumed by the trusted state synchronizer along with
//! their implementations: the trusted sequencer, the execution engine and its durability
//! checkpoints.

pub use executor::{BatchExecutor, ExecutorError, FlushIdSource, StoredFlushId};
mod executor;

pub use sequencer::{RpcBatch, RpcTrustedSequencerClient, SequencerClientError, TrustedSequencerClient};
mod sequencer;

#[cfg(any(test, feature = "test-utils"))]
/// Common test helpers
pub mod test_utils;
