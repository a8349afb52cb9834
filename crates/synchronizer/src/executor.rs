use crate::{flush::DurabilityGate, persistence::StateTransaction, SyncError};

use rollup_node_primitives::{ProcessBatchResponse, ProcessRequest};
use rollup_node_providers::BatchExecutor;
use std::{fmt, sync::Arc};

/// Replays batches on the execution engine and persists the transactions that changed the state.
#[derive(Clone)]
pub struct BatchReplayExecutor {
    engine: Arc<dyn BatchExecutor>,
    gate: Arc<dyn DurabilityGate>,
}

impl fmt::Debug for BatchReplayExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchReplayExecutor").finish_non_exhaustive()
    }
}

impl BatchReplayExecutor {
    /// Returns a new [`BatchReplayExecutor`].
    pub fn new(engine: Arc<dyn BatchExecutor>, gate: Arc<dyn DurabilityGate>) -> Self {
        Self { engine, gate }
    }

    /// Returns the [`DurabilityGate`] the flush ids are reported to.
    pub fn gate(&self) -> &dyn DurabilityGate {
        self.gate.as_ref()
    }

    /// Executes the request with the merkle tree updated, records the resulting flush id and stores
    /// every transaction that changed the state root.
    ///
    /// A failed execution, at the executor level or because the batch ran out of counters, yields
    /// a [`SyncError::FailedExecution`] and stores nothing.
    pub async fn process_and_store<T: StateTransaction>(
        &self,
        tx: &T,
        request: ProcessRequest,
    ) -> Result<ProcessBatchResponse, SyncError> {
        let batch_number = request.batch_number;
        tracing::debug!(
            target: "zkevm::synchronizer",
            batch_number,
            old_state_root = ?request.old_state_root,
            len = request.transactions.len(),
            fork_id = %request.fork_id,
            "processing batch"
        );

        let response = self.engine.process_batch(request, true).await.inspect_err(|err| {
            tracing::error!(target: "zkevm::synchronizer", batch_number, %err, "failed to process batch");
        })?;
        self.gate.pending_flush_id(response.flush_id, &response.prover_id).await?;

        if response.is_failed_execution() {
            let reason = if response.is_executor_level_error {
                "executor level error"
            } else {
                "rom out of counters"
            };
            tracing::warn!(target: "zkevm::synchronizer", batch_number, reason, "failed execution, transactions are not stored");
            return Err(SyncError::FailedExecution { batch_number, reason })
        }

        let mut stored = 0;
        for block in &response.block_responses {
            for (position, transaction) in block.transaction_responses.iter().enumerate() {
                if !transaction.rom_error.changes_state_root() {
                    tracing::debug!(target: "zkevm::synchronizer", batch_number, tx_hash = ?transaction.tx_hash, rom_error = ?transaction.rom_error, "skipping transaction");
                    continue
                }
                tx.store_transaction(batch_number, block.block_number, position, transaction)
                    .await?;
                stored += 1;
            }
        }
        tracing::debug!(target: "zkevm::synchronizer", batch_number, stored, new_state_root = ?response.new_state_root, "stored batch transactions");

        Ok(response)
    }
}
