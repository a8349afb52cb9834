use rollup_node_primitives::{ProcessBatchResponse, ProcessRequest};

/// An error returned by the execution engine.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The engine could not be reached.
    #[error("execution engine unavailable: {0}")]
    Unavailable(String),
    /// The engine rejected the request.
    #[error("execution engine error: {0}")]
    Other(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl ExecutorError {
    /// Returns an [`ExecutorError::Other`] error from the provided string.
    pub fn other(msg: String) -> Self {
        Self::Other(msg.into())
    }
}

/// The execution engine, executing batches on top of a state root.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait BatchExecutor: Send + Sync {
    /// Executes the batch described by the request. When `update_merkle_tree` is set, the engine
    /// persists the resulting state and assigns it a flush id.
    async fn process_batch(
        &self,
        request: ProcessRequest,
        update_merkle_tree: bool,
    ) -> Result<ProcessBatchResponse, ExecutorError>;
}

/// The latest durably persisted flush id of the execution engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFlushId {
    /// The latest flush id persisted by the engine.
    pub flush_id: u64,
    /// The identifier of the running prover instance.
    pub prover_id: String,
}

/// Implementers of the trait report the durability checkpoints of the execution engine.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait FlushIdSource: Send + Sync {
    /// Returns the latest flush id the engine persisted.
    async fn stored_flush_id(&self) -> Result<StoredFlushId, ExecutorError>;
}
