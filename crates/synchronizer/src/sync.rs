use crate::{
    cache::{BatchWindow, TrustedStateCache},
    classify::{apply_options, classify, Classification, ClassifyOptions},
    config::SyncConfig,
    executor::BatchReplayExecutor,
    flush::{DurabilityGate, FlushIdController},
    fork::{self, EtrogSteps, IncaberrySteps, StepContext, StepOutcome},
    metrics::MetricsHandler,
    persistence::{PersistenceCoordinator, StateStore, StateTransaction},
    verify, SyncError,
};

use rollup_node_primitives::Batch;
use rollup_node_providers::{BatchExecutor, FlushIdSource, TrustedSequencerClient};
use std::{sync::Arc, time::Instant};
use tokio_util::sync::CancellationToken;

/// The trusted state synchronizer.
///
/// Mirrors the batches of the trusted sequencer into the local state, one database transaction
/// per batch, replaying their transactions on the execution engine. The synchronizer is driven by
/// a single caller, see [`TrustedStateSynchronizer::sync`].
#[derive(Debug)]
pub struct TrustedStateSynchronizer<C, S> {
    /// The trusted sequencer client.
    client: C,
    /// The transactional boundary over the local state.
    persistence: PersistenceCoordinator<S>,
    /// The replay executor.
    replay: BatchReplayExecutor,
    /// The in-memory trusted state.
    cache: TrustedStateCache,
    /// The options adjusting the batch classification.
    options: ClassifyOptions,
    /// The token cancelling the synchronization.
    cancellation: CancellationToken,
    /// The synchronizer metrics.
    metrics: MetricsHandler,
}

impl<C, S> TrustedStateSynchronizer<C, S>
where
    C: TrustedSequencerClient,
    S: StateStore,
{
    /// Returns a new [`TrustedStateSynchronizer`] gating its commits on the flush ids reported by
    /// the provided source.
    pub fn new(
        client: C,
        store: S,
        engine: Arc<dyn BatchExecutor>,
        flush_ids: Arc<dyn FlushIdSource>,
        config: SyncConfig,
        cancellation: CancellationToken,
    ) -> Self {
        let gate = FlushIdController::new(
            flush_ids,
            config.flush_id_check_interval,
            cancellation.clone(),
        );
        Self::with_gate(client, store, engine, Arc::new(gate), config, cancellation)
    }

    /// Returns a new [`TrustedStateSynchronizer`] gating its commits on the provided
    /// [`DurabilityGate`].
    pub fn with_gate(
        client: C,
        store: S,
        engine: Arc<dyn BatchExecutor>,
        gate: Arc<dyn DurabilityGate>,
        config: SyncConfig,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            client,
            persistence: PersistenceCoordinator::new(store),
            replay: BatchReplayExecutor::new(engine, gate),
            cache: TrustedStateCache::default(),
            options: config.classify,
            cancellation,
            metrics: MetricsHandler::default(),
        }
    }

    /// Returns a reference to the local state store.
    pub const fn store(&self) -> &S {
        self.persistence.store()
    }

    /// Returns the cached batch with the provided number, if any.
    pub fn get_cached_batch(&self, batch_number: u64) -> Option<&Batch> {
        self.cache.get(batch_number)
    }

    /// Drops the in-memory trusted state. The next synchronization reads the local batches from
    /// the store and reprocesses any open batch.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Returns the token cancelling the synchronization.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Synchronizes the trusted state from the provided batch up to the sequencer tip, bounded by
    /// the maximum batch number. The genesis batch is never synchronized.
    pub async fn sync(
        &mut self,
        latest_synced_batch: u64,
        max_batch_number: u64,
    ) -> Result<(), SyncError> {
        self.ensure_not_cancelled()?;
        let tip = self.client.batch_number().await.inspect_err(|err| {
            tracing::warn!(target: "zkevm::synchronizer", %err, "failed to get the trusted sequencer batch number");
        })?;
        let target = tip.min(max_batch_number);
        tracing::info!(target: "zkevm::synchronizer", latest_synced_batch, tip, target, "synchronizing trusted state");

        if target < latest_synced_batch {
            return Ok(())
        }

        for batch_number in latest_synced_batch.max(1)..=target {
            self.sync_batch(batch_number).await?;
        }

        tracing::info!(target: "zkevm::synchronizer", target, "trusted state fully synchronized");
        Ok(())
    }

    /// Fetches and processes a single remote batch inside its own transaction.
    async fn sync_batch(&mut self, batch_number: u64) -> Result<(), SyncError> {
        self.ensure_not_cancelled()?;
        let start = Instant::now();
        let remote = self.client.batch_by_number(batch_number).await.inspect_err(|err| {
            tracing::warn!(target: "zkevm::synchronizer", batch_number, %err, "failed to get batch from the trusted sequencer");
        })?;
        self.metrics.record_fetch(start.elapsed());
        self.ensure_not_cancelled()?;

        let start = Instant::now();
        let tx = self.persistence.begin(batch_number).await?;
        let result = self.process_trusted_batch(&tx, &remote).await;
        let result = self.persistence.finish(batch_number, tx, result, self.replay.gate()).await;

        let (classification, outcome) = result.inspect_err(|err| {
            if err.diagnostics().is_some() {
                self.metrics.record_inconsistency();
            }
        })?;
        self.metrics.record_batch(batch_number, classification, start.elapsed());
        self.cache.update(outcome.batch, outcome.state_root);
        Ok(())
    }

    /// Processes the remote batch against the local state.
    async fn process_trusted_batch(
        &self,
        tx: &S::Transaction,
        remote: &Batch,
    ) -> Result<(Classification, StepOutcome), SyncError> {
        let batch_number = remote.number;
        let window = self.current_window(tx, batch_number).await?;
        verify::check_inconsistency(window.current.as_ref(), remote)?;

        let fork_id = tx.get_fork_id_by_batch_number(batch_number).await?;
        let state_root = self.cache.resolve_state_root(batch_number, &window);
        let classification =
            apply_options(classify(&window, state_root, remote), &window, remote, self.options)?;
        tracing::debug!(
            target: "zkevm::synchronizer",
            batch_number,
            %fork_id,
            ?state_root,
            classification = classification.as_str(),
            "processing trusted batch"
        );

        let ctx = StepContext {
            tx,
            replay: &self.replay,
            remote,
            window: &window,
            state_root,
            fork_id,
        };
        let outcome = if fork_id.is_etrog_or_later() {
            fork::process(&EtrogSteps, classification, &ctx).await?
        } else {
            fork::process(&IncaberrySteps, classification, &ctx).await?
        };
        Ok((classification, outcome))
    }

    /// Returns the local batch with the provided number and its predecessor, from the cache when
    /// it holds them and from the store otherwise.
    async fn current_window(
        &self,
        tx: &S::Transaction,
        batch_number: u64,
    ) -> Result<BatchWindow, SyncError> {
        let cached = self.cache.window(batch_number).unwrap_or_default();
        let current = match cached.current {
            Some(batch) => Some(batch),
            None => {
                tracing::trace!(target: "zkevm::synchronizer", batch_number, "loading batch from the local state");
                tx.get_batch_by_number(batch_number).await?
            }
        };
        let previous = match cached.previous.or_else(|| self.cache.predecessor(batch_number).cloned())
        {
            Some(batch) => Some(batch),
            None => match batch_number.checked_sub(1) {
                Some(previous) => tx.get_batch_by_number(previous).await?,
                None => None,
            },
        };
        Ok(BatchWindow::new(current, previous))
    }

    fn ensure_not_cancelled(&self) -> Result<(), SyncError> {
        if self.cancellation.is_cancelled() {
            tracing::info!(target: "zkevm::synchronizer", "trusted state synchronization cancelled");
            return Err(SyncError::Cancelled)
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        genesis, raw_transaction, remote_batch, state_root_after, v1_data, MockBatchExecutor,
        MockFailure,
    };
    use alloy_primitives::{keccak256, Bytes, B256};
    use rollup_node_primitives::{
        ForkId, ProcessTransactionResponse, ProcessingContext, ProcessingReceipt, RomError,
    };
    use rollup_node_providers::test_utils::MockTrustedSequencer;
    use zkevm_codec::{BatchL2Data, BatchRawV2, L2BlockRaw};
    use zkevm_db::{
        test_utils::{insert_batch, insert_single_fork, setup_test_db},
        Database, DatabaseError, DatabaseOperations, DbErr,
    };

    type Synchronizer = TrustedStateSynchronizer<Arc<MockTrustedSequencer>, Database>;

    struct Harness {
        sequencer: Arc<MockTrustedSequencer>,
        engine: Arc<MockBatchExecutor>,
        sync: Synchronizer,
    }

    async fn harness(fork_id: u64) -> Harness {
        harness_with_config(fork_id, SyncConfig::default()).await
    }

    async fn harness_with_config(fork_id: u64, config: SyncConfig) -> Harness {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let db = setup_test_db().await;
        insert_batch(&db, genesis()).await;
        insert_single_fork(&db, fork_id).await;

        let sequencer = Arc::new(MockTrustedSequencer::default());
        let engine = Arc::new(MockBatchExecutor::default());
        let sync = TrustedStateSynchronizer::new(
            sequencer.clone(),
            db,
            engine.clone(),
            engine.clone(),
            config,
            CancellationToken::new(),
        );
        Harness { sequencer, engine, sync }
    }

    fn root(batch: &Batch) -> Option<B256> {
        Some(batch.state_root)
    }

    #[tokio::test]
    async fn test_full_replay_of_closed_batches() -> eyre::Result<()> {
        let Harness { sequencer, engine, mut sync } = harness(ForkId::INCABERRY.id()).await;
        let batch_1 = remote_batch(1, &v1_data(0..2), root(&genesis()));
        let batch_2 = remote_batch(2, &v1_data(2..3), root(&batch_1));
        sequencer.set_batch(batch_1.clone()).await;
        sequencer.set_batch(batch_2.clone()).await;

        sync.sync(0, u64::MAX).await?;

        assert_eq!(engine.executed_transactions().await, vec![2, 1]);
        let db = sync.store();
        assert_eq!(db.get_batch_by_number(1).await?, Some(batch_1));
        assert_eq!(db.get_batch_by_number(2).await?, Some(batch_2.clone()));
        assert_eq!(db.get_batch_transactions(1).await?.len(), 2);
        assert_eq!(sync.get_cached_batch(2), Some(&batch_2));

        // a second pass performs no execution.
        sync.sync(2, u64::MAX).await?;
        assert_eq!(engine.executed_transactions().await, vec![2, 1]);
        assert_eq!(sync.store().get_batch_transactions(2).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_sync_after_restart_is_idempotent() -> eyre::Result<()> {
        let Harness { sequencer, engine, mut sync } = harness(ForkId::INCABERRY.id()).await;
        let batch_1 = remote_batch(1, &v1_data(0..2), root(&genesis()));
        sequencer.set_batch(batch_1.clone()).await;

        sync.sync(0, u64::MAX).await?;
        sync.clear();
        assert!(sync.get_cached_batch(1).is_none());

        sync.sync(1, u64::MAX).await?;
        assert_eq!(engine.executed_transactions().await, vec![2]);
        assert_eq!(sync.get_cached_batch(1), Some(&batch_1));

        Ok(())
    }

    #[tokio::test]
    async fn test_incremental_replay_executes_only_new_transactions() -> eyre::Result<()> {
        let Harness { sequencer, engine, mut sync } = harness(ForkId::INCABERRY.id()).await;

        sequencer.set_batch(remote_batch(1, &v1_data(0..1), None)).await;
        sync.sync(0, u64::MAX).await?;

        let open = remote_batch(1, &v1_data(0..3), None);
        sequencer.set_batch(open.clone()).await;
        sync.sync(1, u64::MAX).await?;
        assert_eq!(engine.executed_transactions().await, vec![1, 2]);
        let requests = engine.requests.lock().await.clone();
        assert_eq!(
            requests[1].old_state_root,
            state_root_after(genesis().state_root, v1_data(0..1).transactions())
        );

        let stored = sync.store().get_batch_by_number(1).await?.unwrap();
        assert!(stored.is_open());
        assert_eq!(stored.batch_l2_data, open.batch_l2_data);
        assert_eq!(sync.store().get_batch_transactions(1).await?.len(), 3);

        // the batch is closed without new transactions.
        let closed = remote_batch(1, &v1_data(0..3), root(&genesis()));
        sequencer.set_batch(closed.clone()).await;
        sync.sync(1, u64::MAX).await?;
        assert_eq!(engine.executed_transactions().await, vec![1, 2]);
        assert_eq!(sync.store().get_batch_by_number(1).await?, Some(closed));

        Ok(())
    }

    #[tokio::test]
    async fn test_incremental_replay_closes_batch() -> eyre::Result<()> {
        let Harness { sequencer, engine, mut sync } = harness(ForkId::INCABERRY.id()).await;

        sequencer.set_batch(remote_batch(1, &v1_data(0..1), None)).await;
        sync.sync(0, u64::MAX).await?;

        let closed = remote_batch(1, &v1_data(0..2), root(&genesis()));
        sequencer.set_batch(closed.clone()).await;
        sync.sync(1, u64::MAX).await?;

        assert_eq!(engine.executed_transactions().await, vec![1, 1]);
        assert_eq!(sync.store().get_batch_by_number(1).await?, Some(closed.clone()));
        assert_eq!(sync.get_cached_batch(1), Some(&closed));

        Ok(())
    }

    #[tokio::test]
    async fn test_open_batch_without_cached_root_is_reprocessed() -> eyre::Result<()> {
        let Harness { sequencer, engine, mut sync } = harness(ForkId::INCABERRY.id()).await;

        sequencer.set_batch(remote_batch(1, &v1_data(0..1), None)).await;
        sync.sync(0, u64::MAX).await?;
        sync.clear();

        let open = remote_batch(1, &v1_data(0..2), None);
        sequencer.set_batch(open.clone()).await;
        sync.sync(1, u64::MAX).await?;

        // the batch was reset and replayed in full on top of the genesis root.
        assert_eq!(engine.executed_transactions().await, vec![1, 2]);
        let requests = engine.requests.lock().await.clone();
        assert_eq!(requests[1].old_state_root, genesis().state_root);
        assert_eq!(sync.store().get_batch_by_number(1).await?, Some(open));
        assert_eq!(sync.store().get_batch_transactions(1).await?.len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_wrong_state_root_is_fatal_and_rolled_back() -> eyre::Result<()> {
        let Harness { sequencer, mut sync, .. } = harness(ForkId::INCABERRY.id()).await;
        let mut batch_1 = remote_batch(1, &v1_data(0..2), root(&genesis()));
        batch_1.state_root = B256::repeat_byte(0x99);
        sequencer.set_batch(batch_1).await;

        let err = sync.sync(0, u64::MAX).await.unwrap_err();
        assert!(err.is_fatal());
        let diagnostics = err.diagnostics().unwrap();
        assert_eq!(diagnostics.batch_number, 1);
        assert!(diagnostics.computed_state_root.is_some());

        assert_eq!(sync.store().get_batch_by_number(1).await?, None);
        assert_eq!(sync.store().get_batch_transactions(1).await?.len(), 0);
        assert!(sync.get_cached_batch(1).is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_remote_reopened_batch_is_fatal() -> eyre::Result<()> {
        let Harness { sequencer, mut sync, .. } = harness(ForkId::INCABERRY.id()).await;
        sequencer.set_batch(remote_batch(1, &v1_data(0..1), root(&genesis()))).await;
        sync.sync(0, u64::MAX).await?;

        sequencer.set_batch(remote_batch(1, &v1_data(0..1), None)).await;
        let err = sync.sync(1, u64::MAX).await.unwrap_err();
        assert!(matches!(err, SyncError::Inconsistency(_)));

        Ok(())
    }

    #[tokio::test]
    async fn test_diverging_data_is_fatal() -> eyre::Result<()> {
        let Harness { sequencer, engine, mut sync } = harness(ForkId::INCABERRY.id()).await;
        sequencer.set_batch(remote_batch(1, &v1_data(0..2), None)).await;
        sync.sync(0, u64::MAX).await?;

        sequencer.set_batch(remote_batch(1, &v1_data([0, 5, 6]), None)).await;
        let err = sync.sync(1, u64::MAX).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(engine.executed_transactions().await, vec![2]);

        Ok(())
    }

    #[tokio::test]
    async fn test_already_closed_batch_is_verified() -> eyre::Result<()> {
        let Harness { sequencer, engine, mut sync } = harness(ForkId::INCABERRY.id()).await;
        let batch_1 = remote_batch(1, &v1_data(0..1), root(&genesis()));
        sequencer.set_batch(batch_1.clone()).await;
        sync.sync(0, u64::MAX).await?;

        // a timestamp change is tolerated.
        let mut retimed = batch_1.clone();
        retimed.timestamp += 1;
        sequencer.set_batch(retimed).await;
        sync.sync(1, u64::MAX).await?;
        assert_eq!(engine.executed_transactions().await, vec![1]);

        // any other change is not.
        let mut rehashed = batch_1;
        rehashed.acc_input_hash = B256::repeat_byte(0x77);
        sequencer.set_batch(rehashed).await;
        let err = sync.sync(1, u64::MAX).await.unwrap_err();
        assert!(err.diagnostics().unwrap().differing_fields.contains(&"acc_input_hash"));

        Ok(())
    }

    #[tokio::test]
    async fn test_revisited_closed_batch_is_verified() -> eyre::Result<()> {
        let Harness { sequencer, engine, mut sync } = harness(ForkId::INCABERRY.id()).await;
        let batch_1 = remote_batch(1, &v1_data(0..1), root(&genesis()));
        let batch_2 = remote_batch(2, &v1_data(1..2), root(&batch_1));
        sequencer.set_batch(batch_1.clone()).await;
        sequencer.set_batch(batch_2.clone()).await;
        sync.sync(0, u64::MAX).await?;

        // batch 1 is no longer the latest local batch.
        let mut retimed = batch_1.clone();
        retimed.timestamp += 1;
        sequencer.set_batch(retimed).await;
        sync.sync(1, u64::MAX).await?;

        assert_eq!(engine.executed_transactions().await, vec![1, 1]);
        assert_eq!(sync.store().get_batch_by_number(1).await?, Some(batch_1));
        assert_eq!(sync.store().get_batch_by_number(2).await?, Some(batch_2.clone()));
        assert_eq!(sync.get_cached_batch(2), Some(&batch_2));

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_execution_stores_nothing() -> eyre::Result<()> {
        let Harness { sequencer, engine, mut sync } = harness(ForkId::INCABERRY.id()).await;
        sequencer.set_batch(remote_batch(1, &v1_data(0..2), root(&genesis()))).await;
        *engine.failure.lock().await = Some(MockFailure::OutOfCounters);

        let err = sync.sync(0, u64::MAX).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::FailedExecution { batch_number: 1, reason: "rom out of counters" }
        ));
        assert!(!err.is_fatal());
        assert_eq!(sync.store().get_batch_by_number(1).await?, None);

        *engine.failure.lock().await = Some(MockFailure::ExecutorLevel);
        let err = sync.sync(0, u64::MAX).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::FailedExecution { batch_number: 1, reason: "executor level error" }
        ));
        assert_eq!(sync.store().get_batch_transactions(1).await?.len(), 0);

        *engine.failure.lock().await = Some(MockFailure::Error);
        let err = sync.sync(0, u64::MAX).await.unwrap_err();
        assert!(matches!(err, SyncError::Executor(_)));
        assert!(!err.is_fatal());

        // the batch is synchronized once the engine recovers.
        *engine.failure.lock().await = None;
        sync.sync(0, u64::MAX).await?;
        assert!(sync.store().get_batch_by_number(1).await?.unwrap().is_closed());

        Ok(())
    }

    #[tokio::test]
    async fn test_only_state_changing_transactions_are_stored() -> eyre::Result<()> {
        let Harness { sequencer, engine, mut sync } = harness(ForkId::INCABERRY.id()).await;
        sequencer.set_batch(remote_batch(1, &v1_data(0..3), None)).await;

        let mut rejected = Vec::new();
        raw_transaction(1, Some(255)).encode(&mut rejected);
        engine.rom_errors.lock().await.insert(keccak256(&rejected), RomError::IntrinsicInvalidNonce);

        sync.sync(0, u64::MAX).await?;
        let stored = sync.store().get_batch_transactions(1).await?;
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|tx| tx.encoded != Bytes::from(rejected.clone())));

        Ok(())
    }

    #[tokio::test]
    async fn test_empty_batches_are_not_executed() -> eyre::Result<()> {
        let config = SyncConfig {
            classify: ClassifyOptions { accept_empty_closed_batches: true, ..Default::default() },
            ..Default::default()
        };
        let Harness { sequencer, engine, mut sync } =
            harness_with_config(ForkId::INCABERRY.id(), config).await;
        let empty = remote_batch(1, &v1_data(0..0), root(&genesis()));
        sequencer.set_batch(empty.clone()).await;

        sync.sync(0, u64::MAX).await?;
        assert!(engine.executed_transactions().await.is_empty());
        assert_eq!(sync.store().get_batch_by_number(1).await?, Some(empty));

        Ok(())
    }

    #[tokio::test]
    async fn test_empty_closed_batches_are_rejected_by_default() -> eyre::Result<()> {
        let Harness { sequencer, engine, mut sync } = harness(ForkId::INCABERRY.id()).await;

        // an empty open batch is synchronized.
        sequencer.set_batch(remote_batch(1, &v1_data(0..0), None)).await;
        sync.sync(0, u64::MAX).await?;
        assert!(sync.store().get_batch_by_number(1).await?.unwrap().is_open());

        // closing it without transactions is rejected and nothing is written.
        sequencer.set_batch(remote_batch(1, &v1_data(0..0), root(&genesis()))).await;
        let err = sync.sync(1, u64::MAX).await.unwrap_err();
        assert!(matches!(err, SyncError::EmptyClosedBatch(1)));
        assert!(!err.is_fatal());
        assert!(sync.store().get_batch_by_number(1).await?.unwrap().is_open());
        assert!(engine.executed_transactions().await.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_reprocess_full_batch_on_close() -> eyre::Result<()> {
        let config = SyncConfig {
            classify: ClassifyOptions { reprocess_full_batch_on_close: true, ..Default::default() },
            ..Default::default()
        };
        let Harness { sequencer, engine, mut sync } =
            harness_with_config(ForkId::INCABERRY.id(), config).await;

        sequencer.set_batch(remote_batch(1, &v1_data(0..1), None)).await;
        sync.sync(0, u64::MAX).await?;

        // new transactions on an open remote batch are replayed incrementally.
        sequencer.set_batch(remote_batch(1, &v1_data(0..2), None)).await;
        sync.sync(1, u64::MAX).await?;
        assert_eq!(engine.executed_transactions().await, vec![1, 1]);

        // once closed, the batch is replayed from scratch on top of the genesis root.
        let closed = remote_batch(1, &v1_data(0..3), root(&genesis()));
        sequencer.set_batch(closed.clone()).await;
        sync.sync(1, u64::MAX).await?;
        assert_eq!(engine.executed_transactions().await, vec![1, 1, 3]);
        let requests = engine.requests.lock().await.clone();
        assert_eq!(requests[2].old_state_root, genesis().state_root);
        assert_eq!(sync.store().get_batch_by_number(1).await?, Some(closed));
        assert_eq!(sync.store().get_batch_transactions(1).await?.len(), 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_sync_bounds() -> eyre::Result<()> {
        let Harness { sequencer, mut sync, .. } = harness(ForkId::INCABERRY.id()).await;
        let batch_1 = remote_batch(1, &v1_data(0..1), root(&genesis()));
        let batch_2 = remote_batch(2, &v1_data(1..2), root(&batch_1));
        let batch_3 = remote_batch(3, &v1_data(2..3), root(&batch_2));
        for batch in [batch_1, batch_2, batch_3] {
            sequencer.set_batch(batch).await;
        }

        // the target is below the latest synced batch.
        sync.sync(5, u64::MAX).await?;
        assert_eq!(*sequencer.fetches.lock().await, 0);

        sync.sync(0, 2).await?;
        assert_eq!(*sequencer.fetches.lock().await, 2);
        assert_eq!(sync.store().get_last_batch_number().await?, Some(2));

        *sequencer.tip.lock().await = Some(2);
        sync.sync(2, u64::MAX).await?;
        assert_eq!(sync.store().get_last_batch_number().await?, Some(2));

        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_sync_stops() -> eyre::Result<()> {
        let Harness { sequencer, mut sync, .. } = harness(ForkId::INCABERRY.id()).await;
        sequencer.set_batch(remote_batch(1, &v1_data(0..1), root(&genesis()))).await;

        sync.cancellation_token().cancel();
        assert!(matches!(sync.sync(0, u64::MAX).await, Err(SyncError::Cancelled)));
        assert_eq!(sync.store().get_batch_by_number(1).await?, None);

        Ok(())
    }

    #[tokio::test]
    async fn test_etrog_incremental_replay() -> eyre::Result<()> {
        let Harness { sequencer, engine, mut sync } = harness(ForkId::ETROG.id()).await;
        let block = |nonces: std::ops::Range<u64>| L2BlockRaw {
            delta_timestamp: 1,
            index_l1_info_tree: 0,
            transactions: nonces.map(|n| raw_transaction(n, Some(255))).collect(),
        };

        let first = BatchL2Data::V2(BatchRawV2 { blocks: vec![block(0..1)] });
        sequencer.set_batch(remote_batch(1, &first, None)).await;
        sync.sync(0, u64::MAX).await?;

        let all = BatchL2Data::V2(BatchRawV2 { blocks: vec![block(0..1), block(1..3)] });
        let closed = remote_batch(1, &all, root(&genesis()));
        sequencer.set_batch(closed.clone()).await;
        sync.sync(1, u64::MAX).await?;

        assert_eq!(engine.executed_transactions().await, vec![1, 2]);
        let requests = engine.requests.lock().await.clone();
        assert!(requests.iter().all(|r| r.fork_id == ForkId::ETROG));
        assert_eq!(sync.store().get_batch_by_number(1).await?, Some(closed));

        Ok(())
    }

    /// A store whose batch transactions fail to close batches and to roll back.
    #[derive(Debug)]
    struct FailingStore;

    #[derive(Debug)]
    struct FailingTransaction;

    #[async_trait::async_trait]
    impl StateStore for FailingStore {
        type Transaction = FailingTransaction;

        async fn begin(&self) -> Result<Self::Transaction, DatabaseError> {
            Ok(FailingTransaction)
        }
    }

    #[async_trait::async_trait]
    impl StateTransaction for FailingTransaction {
        async fn get_batch_by_number(
            &self,
            batch_number: u64,
        ) -> Result<Option<Batch>, DatabaseError> {
            Ok((batch_number == 0).then(genesis))
        }

        async fn get_fork_id_by_batch_number(&self, _: u64) -> Result<ForkId, DatabaseError> {
            Ok(ForkId::INCABERRY)
        }

        async fn open_batch(&self, _: ProcessingContext) -> Result<(), DatabaseError> {
            Ok(())
        }

        async fn close_batch(&self, _: ProcessingReceipt) -> Result<(), DatabaseError> {
            Err(DbErr::Custom("close failed".to_string()).into())
        }

        async fn update_batch_l2_data(&self, _: u64, _: Bytes) -> Result<(), DatabaseError> {
            Ok(())
        }

        async fn store_transaction(
            &self,
            _: u64,
            _: u64,
            _: usize,
            _: &ProcessTransactionResponse,
        ) -> Result<(), DatabaseError> {
            Ok(())
        }

        async fn reset_trusted_state(&self, _: u64) -> Result<u64, DatabaseError> {
            Ok(0)
        }

        async fn commit(self) -> Result<(), DatabaseError> {
            Ok(())
        }

        async fn rollback(self) -> Result<(), DatabaseError> {
            Err(DbErr::Custom("rollback failed".to_string()).into())
        }
    }

    #[tokio::test]
    async fn test_rollback_failure_takes_precedence() {
        let sequencer = Arc::new(MockTrustedSequencer::new([remote_batch(
            1,
            &v1_data(0..1),
            root(&genesis()),
        )]));
        let engine = Arc::new(MockBatchExecutor::default());
        let mut sync = TrustedStateSynchronizer::new(
            sequencer,
            FailingStore,
            engine.clone(),
            engine,
            SyncConfig::default(),
            CancellationToken::new(),
        );

        let err = sync.sync(0, u64::MAX).await.unwrap_err();
        let SyncError::Rollback { rollback, cause } = err else {
            panic!("expected rollback error, got {err:?}")
        };
        assert!(rollback.to_string().contains("rollback failed"));
        assert!(cause.to_string().contains("close failed"));
    }
}
