//! The processing steps of a trusted batch, implemented per protocol fork.

mod etrog;
pub use etrog::EtrogSteps;

mod incaberry;
pub use incaberry::IncaberrySteps;

use crate::{
    cache::BatchWindow, classify::Classification, executor::BatchReplayExecutor,
    persistence::StateTransaction, verify, SyncError,
};

use alloy_primitives::{Bytes, B256};
use rollup_node_primitives::{Batch, ExecutionMode, ForkId, ProcessRequest, ProcessingReceipt};
use zkevm_db::DatabaseError;

/// The context shared by the processing steps of a remote batch.
#[derive(Debug)]
pub struct StepContext<'a, T> {
    /// The batch transaction.
    pub tx: &'a T,
    /// The replay executor.
    pub replay: &'a BatchReplayExecutor,
    /// The remote batch.
    pub remote: &'a Batch,
    /// The local view of the batch and its predecessor.
    pub window: &'a BatchWindow,
    /// The state root to execute new transactions on top of.
    pub state_root: Option<B256>,
    /// The fork governing the batch.
    pub fork_id: ForkId,
}

impl<T> StepContext<'_, T> {
    fn batch_number(&self) -> u64 {
        self.remote.number
    }

    fn previous(&self) -> Result<&Batch, SyncError> {
        self.window.previous.as_ref().ok_or_else(|| {
            SyncError::MissingPreviousBatch(self.batch_number().saturating_sub(1))
        })
    }

    fn state_root(&self) -> Result<B256, SyncError> {
        self.state_root.ok_or_else(|| SyncError::MissingStateRoot(self.batch_number()))
    }

    /// Returns the request executing the provided transactions on top of the state root.
    fn request(
        &self,
        transactions: Bytes,
        old_state_root: B256,
    ) -> Result<ProcessRequest, SyncError> {
        let remote = self.remote;
        Ok(ProcessRequest {
            batch_number: remote.number,
            old_state_root,
            old_acc_input_hash: self.previous()?.acc_input_hash,
            coinbase: remote.coinbase,
            timestamp: remote.timestamp,
            global_exit_root: remote.global_exit_root,
            transactions,
            fork_id: self.fork_id,
            execution_mode: ExecutionMode::Synchronizer,
        })
    }
}

/// The outcome of a processing step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// The local batch after the step.
    pub batch: Batch,
    /// The state root applied after the step.
    pub state_root: B256,
}

/// The processing steps of a remote batch for a protocol fork.
///
/// Only the derivation of the transactions to execute during an incremental replay differs across
/// forks, the remaining steps share a default implementation.
#[async_trait::async_trait]
pub trait ForkSteps: Send + Sync {
    /// Returns the transactions of the remote stream not yet present in the stored stream,
    /// encoded for execution. The stored stream is a strict prefix of the remote one.
    fn new_transactions(&self, stored: &[u8], remote: &[u8], fork_id: ForkId)
        -> Result<Bytes, SyncError>;

    /// Opens the batch and executes its complete transaction stream on top of the previous
    /// batch's state root, closing it if the remote batch is closed.
    async fn full_replay<T: StateTransaction>(
        &self,
        ctx: &StepContext<'_, T>,
    ) -> Result<StepOutcome, SyncError> {
        let remote = ctx.remote;
        let previous = ctx.previous()?;
        tracing::info!(target: "zkevm::synchronizer", batch_number = remote.number, "batch needs to be synchronized");
        ctx.tx.open_batch(remote.processing_context()).await?;

        if remote.batch_l2_data.is_empty() {
            tracing::debug!(target: "zkevm::synchronizer", batch_number = remote.number, "opened batch with empty l2 data");
            if remote.is_open() {
                return Ok(StepOutcome { batch: remote.clone(), state_root: previous.state_root })
            }
            self.close(ctx, remote.state_root, remote.local_exit_root).await?;
            return Ok(StepOutcome { batch: remote.clone(), state_root: remote.state_root })
        }

        let request = ctx.request(remote.batch_l2_data.clone(), previous.state_root)?;
        let response = ctx.replay.process_and_store(ctx.tx, request).await?;
        verify::check_execution_result(Some(previous), remote, &response)?;
        if remote.is_closed() {
            self.close(ctx, response.new_state_root, response.new_local_exit_root).await?;
        }

        tracing::info!(target: "zkevm::synchronizer", batch_number = remote.number, closed = remote.is_closed(), "batch synchronized");
        Ok(StepOutcome { batch: remote.clone(), state_root: response.new_state_root })
    }

    /// Executes only the new transactions of an open local batch on top of its applied state root,
    /// closing the batch if the remote batch is closed.
    async fn incremental_replay<T: StateTransaction>(
        &self,
        ctx: &StepContext<'_, T>,
    ) -> Result<StepOutcome, SyncError> {
        let remote = ctx.remote;
        let stored = ctx.window.current.as_ref().ok_or_else(|| {
            SyncError::Database(DatabaseError::BatchNotFound(remote.number))
        })?;
        let state_root = ctx.state_root()?;

        if !verify::check_incremental_data(stored, remote)? {
            tracing::info!(target: "zkevm::synchronizer", batch_number = remote.number, "no new transactions, checking if the batch is closed");
            if remote.is_open() {
                return Ok(StepOutcome { batch: stored.clone(), state_root })
            }
            verify::check_applied_state_root(stored, remote, state_root)?;
            self.close(ctx, remote.state_root, remote.local_exit_root).await?;
            let batch = closed(stored, remote, remote.state_root, remote.local_exit_root);
            return Ok(StepOutcome { batch, state_root: remote.state_root })
        }

        let transactions =
            self.new_transactions(&stored.batch_l2_data, &remote.batch_l2_data, ctx.fork_id)?;
        tracing::info!(target: "zkevm::synchronizer", batch_number = remote.number, len = transactions.len(), "processing new transactions");
        let request = ctx.request(transactions, state_root)?;
        let response = ctx.replay.process_and_store(ctx.tx, request).await?;
        verify::check_execution_result(Some(stored), remote, &response)?;

        let batch = if remote.is_closed() {
            self.close(ctx, response.new_state_root, response.new_local_exit_root).await?;
            closed(stored, remote, response.new_state_root, response.new_local_exit_root)
        } else {
            ctx.tx.update_batch_l2_data(remote.number, remote.batch_l2_data.clone()).await?;
            Batch { batch_l2_data: remote.batch_l2_data.clone(), ..stored.clone() }
        };

        Ok(StepOutcome { batch, state_root: response.new_state_root })
    }

    /// Discards the local batch and replays it from scratch on top of the previous batch's state
    /// root.
    async fn reprocess<T: StateTransaction>(
        &self,
        ctx: &StepContext<'_, T>,
    ) -> Result<StepOutcome, SyncError> {
        let remote = ctx.remote;
        let previous = ctx.previous()?;
        tracing::warn!(target: "zkevm::synchronizer", batch_number = remote.number, reset_to = previous.number, "resetting trusted state to reprocess batch");
        let deleted = ctx.tx.reset_trusted_state(previous.number).await?;
        tracing::debug!(target: "zkevm::synchronizer", deleted, "deleted batches");

        let window = BatchWindow::new(None, Some(previous.clone()));
        let ctx = StepContext {
            tx: ctx.tx,
            replay: ctx.replay,
            remote,
            window: &window,
            state_root: Some(previous.state_root),
            fork_id: ctx.fork_id,
        };
        self.full_replay(&ctx).await
    }

    /// Closes the batch with the provided roots.
    ///
    /// A batch found already closed is tolerated if the stored batch matches the remote batch,
    /// the timestamp aside.
    async fn close<T: StateTransaction>(
        &self,
        ctx: &StepContext<'_, T>,
        state_root: B256,
        local_exit_root: B256,
    ) -> Result<(), SyncError> {
        let remote = ctx.remote;
        let receipt = ProcessingReceipt {
            batch_number: remote.number,
            state_root,
            local_exit_root,
            acc_input_hash: remote.acc_input_hash,
            batch_l2_data: remote.batch_l2_data.clone(),
        };
        tracing::debug!(target: "zkevm::synchronizer", batch_number = remote.number, ?state_root, "closing batch");

        match ctx.tx.close_batch(receipt).await {
            Ok(()) => Ok(()),
            Err(DatabaseError::BatchAlreadyClosed(batch_number)) => {
                tracing::warn!(target: "zkevm::synchronizer", batch_number, "batch already closed, verifying stored batch");
                let stored = ctx
                    .tx
                    .get_batch_by_number(batch_number)
                    .await?
                    .ok_or(DatabaseError::BatchNotFound(batch_number))?;
                verify::check_already_closed(&stored, remote)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Returns the stored batch as closed by the remote batch with the provided roots.
fn closed(stored: &Batch, remote: &Batch, state_root: B256, local_exit_root: B256) -> Batch {
    Batch {
        state_root,
        local_exit_root,
        acc_input_hash: remote.acc_input_hash,
        batch_l2_data: remote.batch_l2_data.clone(),
        ..stored.clone()
    }
}

/// Dispatches the remote batch to the step matching its [`Classification`].
pub async fn process<F: ForkSteps, T: StateTransaction>(
    steps: &F,
    classification: Classification,
    ctx: &StepContext<'_, T>,
) -> Result<StepOutcome, SyncError> {
    match classification {
        Classification::AlreadySynced => {
            tracing::debug!(target: "zkevm::synchronizer", batch_number = ctx.remote.number, "batch already synchronized");
            let batch = ctx.window.current.clone().unwrap_or_else(|| ctx.remote.clone());
            Ok(StepOutcome { batch, state_root: ctx.state_root()? })
        }
        Classification::FullReplay => steps.full_replay(ctx).await,
        Classification::Reprocess => steps.reprocess(ctx).await,
        Classification::Incremental => steps.incremental_replay(ctx).await,
    }
}
