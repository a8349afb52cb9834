//! The trusted state synchronizer of a zkEVM rollup node.
//!
//! The synchronizer keeps the local trusted state in lock step with the batches reported by the
//! trusted sequencer. Each remote batch is compared with its local counterpart and classified:
//! already synchronized batches are skipped, unknown batches are replayed in full, open batches
//! are replayed incrementally and open batches whose intermediate state root was lost are
//! reprocessed from scratch. Every batch is persisted in its own database transaction, committed
//! only once the execution engine has durably stored the state the batch depends on.

mod cache;
pub use cache::{AppliedStateRoot, BatchWindow, TrustedStateCache};

mod classify;
pub use classify::{apply_options, classify, Classification, ClassifyOptions};

mod config;
pub use config::{
    SyncConfig, TrustedSyncArgs, DEFAULT_SEQUENCER_INITIAL_BACKOFF_MS,
    DEFAULT_SEQUENCER_MAX_RETRIES,
};

mod error;
pub use error::SyncError;

mod executor;
pub use executor::BatchReplayExecutor;

mod flush;
pub use flush::{DurabilityGate, FlushIdController, DEFAULT_FLUSH_ID_CHECK_INTERVAL};

pub mod fork;

mod metrics;

mod persistence;
pub use persistence::{PersistenceCoordinator, StateStore, StateTransaction};

mod sync;
pub use sync::TrustedStateSynchronizer;

pub mod verify;

#[cfg(any(test, feature = "test-utils"))]
/// Common test helpers
pub mod test_utils;
