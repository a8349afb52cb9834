use crate::verify::BatchDiagnostics;

use rollup_node_providers::{ExecutorError, SequencerClientError};
use zkevm_codec::CodecError;
use zkevm_db::DatabaseError;

/// A type that represents an error that occurred while synchronizing the trusted state.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// An error occurred while querying the trusted sequencer.
    #[error("trusted sequencer error: {0}")]
    Sequencer(#[from] SequencerClientError),
    /// An error occurred while interacting with the database.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
    /// The raw transaction stream of a batch could not be decoded or encoded.
    #[error("batch l2 data codec error: {0}")]
    Codec(#[from] CodecError),
    /// The execution engine returned an error.
    #[error("execution engine error: {0}")]
    Executor(#[from] ExecutorError),
    /// The execution engine reported a failed execution, nothing was persisted.
    #[error("batch {batch_number} failed execution: {reason}")]
    FailedExecution {
        /// The number of the batch.
        batch_number: u64,
        /// The failure reported by the engine.
        reason: &'static str,
    },
    /// The local and remote states diverged in a way that cannot be repaired automatically.
    #[error("trusted state inconsistency: {0}")]
    Inconsistency(Box<BatchDiagnostics>),
    /// The local state is missing the batch preceding the batch to synchronize.
    #[error("batch {0} is missing from the local state")]
    MissingPreviousBatch(u64),
    /// The remote batch is closed without any transaction and such batches are not accepted.
    #[error("batch {0} is closed without transactions")]
    EmptyClosedBatch(u64),
    /// The state root to execute the batch on top of is unknown.
    #[error("no applied state root for batch {0}")]
    MissingStateRoot(u64),
    /// The execution engine returned a zero flush id, its database is read only.
    #[error("execution engine returned flush id 0, check that the executor database is writable")]
    InvalidFlushId,
    /// The execution engine restarted since the last execution.
    #[error("execution engine restarted: prover id changed from {previous} to {current}")]
    ProverRestarted {
        /// The prover id observed first.
        previous: String,
        /// The newly observed prover id.
        current: String,
    },
    /// The synchronization was cancelled.
    #[error("trusted state synchronization cancelled")]
    Cancelled,
    /// Rolling back the batch transaction failed after an error.
    #[error("rollback failed: {rollback}, after: {cause}")]
    Rollback {
        /// The error returned by the rollback.
        rollback: DatabaseError,
        /// The error that triggered the rollback.
        cause: Box<SyncError>,
    },
}

impl SyncError {
    /// Returns true if the error cannot be recovered by retrying the synchronization, the node
    /// must stop or rebuild its trusted state.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Inconsistency(_) |
            Self::InvalidFlushId |
            Self::ProverRestarted { .. } |
            Self::MissingPreviousBatch(_) => true,
            Self::Rollback { cause, .. } => cause.is_fatal(),
            _ => false,
        }
    }

    /// Returns the [`BatchDiagnostics`] if the error is an [`SyncError::Inconsistency`].
    pub fn diagnostics(&self) -> Option<&BatchDiagnostics> {
        match self {
            Self::Inconsistency(diagnostics) => Some(diagnostics),
            Self::Rollback { cause, .. } => cause.diagnostics(),
            _ => None,
        }
    }
}

impl From<BatchDiagnostics> for SyncError {
    fn from(diagnostics: BatchDiagnostics) -> Self {
        Self::Inconsistency(Box::new(diagnostics))
    }
}
