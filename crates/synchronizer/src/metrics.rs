use crate::classify::Classification;

use metrics::{Counter, Gauge, Histogram};
use metrics_derive::Metrics;
use std::{collections::HashMap, time::Duration};
use strum::IntoEnumIterator;

/// The metric handler for the trusted state synchronizer.
#[derive(Debug)]
pub(crate) struct MetricsHandler {
    /// The synchronizer metrics.
    sync: TrustedSyncMetrics,
    /// The metrics per batch classification.
    classifications: HashMap<Classification, ClassificationMetrics>,
}

impl MetricsHandler {
    /// Records the duration of a remote batch fetch.
    pub(crate) fn record_fetch(&self, duration: Duration) {
        self.sync.fetch_batch_duration.record(duration.as_secs_f64());
    }

    /// Records a synchronized batch.
    pub(crate) fn record_batch(
        &self,
        batch_number: u64,
        classification: Classification,
        duration: Duration,
    ) {
        self.sync.synced_batches.increment(1);
        self.sync.last_synced_batch.set(batch_number as f64);
        if let Some(metrics) = self.classifications.get(&classification) {
            metrics.batches.increment(1);
            metrics.process_batch_duration.record(duration.as_secs_f64());
        }
    }

    /// Records a batch inconsistency.
    pub(crate) fn record_inconsistency(&self) {
        self.sync.inconsistencies.increment(1);
    }
}

impl Default for MetricsHandler {
    fn default() -> Self {
        Self {
            sync: TrustedSyncMetrics::default(),
            classifications: Classification::iter()
                .map(|c| {
                    let label = c.as_str();
                    (c, ClassificationMetrics::new_with_labels(&[("classification", label)]))
                })
                .collect(),
        }
    }
}

/// The metrics for the [`super::TrustedStateSynchronizer`].
#[derive(Metrics, Clone)]
#[metrics(scope = "trusted_sync")]
pub(crate) struct TrustedSyncMetrics {
    /// The number of synchronized batches.
    synced_batches: Counter,
    /// The last synchronized batch number.
    last_synced_batch: Gauge,
    /// The duration of fetching a batch from the trusted sequencer.
    fetch_batch_duration: Histogram,
    /// The number of fatal inconsistencies detected.
    inconsistencies: Counter,
}

/// The metrics for a batch classification.
#[derive(Metrics, Clone)]
#[metrics(scope = "trusted_sync")]
pub(crate) struct ClassificationMetrics {
    /// The number of batches processed with the classification.
    batches: Counter,
    /// The duration of processing a batch.
    process_batch_duration: Histogram,
}
