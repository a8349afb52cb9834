//! Test utils for providers.

use crate::{
    ExecutorError, FlushIdSource, SequencerClientError, StoredFlushId, TrustedSequencerClient,
};
use std::collections::BTreeMap;

use rollup_node_primitives::Batch;
use tokio::sync::Mutex;

/// A [`TrustedSequencerClient`] serving batches from memory.
#[derive(Debug, Default)]
pub struct MockTrustedSequencer {
    /// The batches known to the sequencer.
    pub batches: Mutex<BTreeMap<u64, Batch>>,
    /// Overrides the reported tip when set.
    pub tip: Mutex<Option<u64>>,
    /// The number of `batch_by_number` calls served.
    pub fetches: Mutex<u64>,
}

impl MockTrustedSequencer {
    /// Returns a new [`MockTrustedSequencer`] serving the provided batches.
    pub fn new(batches: impl IntoIterator<Item = Batch>) -> Self {
        Self {
            batches: Mutex::new(batches.into_iter().map(|b| (b.number, b)).collect()),
            ..Default::default()
        }
    }

    /// Inserts or replaces a batch.
    pub async fn set_batch(&self, batch: Batch) {
        self.batches.lock().await.insert(batch.number, batch);
    }
}

#[async_trait::async_trait]
impl TrustedSequencerClient for MockTrustedSequencer {
    async fn batch_number(&self) -> Result<u64, SequencerClientError> {
        if let Some(tip) = *self.tip.lock().await {
            return Ok(tip)
        }
        Ok(self.batches.lock().await.keys().next_back().copied().unwrap_or_default())
    }

    async fn batch_by_number(&self, batch_number: u64) -> Result<Batch, SequencerClientError> {
        *self.fetches.lock().await += 1;
        self.batches
            .lock()
            .await
            .get(&batch_number)
            .cloned()
            .ok_or(SequencerClientError::BatchNotFound(batch_number))
    }
}

/// A [`FlushIdSource`] reporting a configurable stored flush id.
#[derive(Debug)]
pub struct MockFlushIdSource {
    /// The reported stored flush id.
    pub stored: Mutex<StoredFlushId>,
    /// The number of queries served.
    pub queries: Mutex<u64>,
}

impl MockFlushIdSource {
    /// Returns a new [`MockFlushIdSource`] reporting the provided flush id and prover id.
    pub fn new(flush_id: u64, prover_id: &str) -> Self {
        Self {
            stored: Mutex::new(StoredFlushId { flush_id, prover_id: prover_id.to_string() }),
            queries: Mutex::new(0),
        }
    }

    /// Sets the stored flush id.
    pub async fn set_flush_id(&self, flush_id: u64) {
        self.stored.lock().await.flush_id = flush_id;
    }
}

#[async_trait::async_trait]
impl FlushIdSource for MockFlushIdSource {
    async fn stored_flush_id(&self) -> Result<StoredFlushId, ExecutorError> {
        *self.queries.lock().await += 1;
        Ok(self.stored.lock().await.clone())
    }
}
