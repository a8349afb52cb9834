use crate::SyncError;

use rollup_node_providers::FlushIdSource;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// The default interval between two queries of the stored flush id.
pub const DEFAULT_FLUSH_ID_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// A gate delaying database commits until the execution engine has durably persisted the changes
/// of the executions they depend on.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait DurabilityGate: Send + Sync {
    /// Records the flush id returned by an execution along with the identifier of the prover
    /// which produced it.
    async fn pending_flush_id(&self, flush_id: u64, prover_id: &str) -> Result<(), SyncError>;

    /// Waits until the latest pending flush id is durably stored by the engine.
    async fn check_flush_id(&self) -> Result<(), SyncError>;
}

#[derive(Debug, Default)]
struct FlushState {
    /// The latest flush id returned by the engine.
    latest_flush_id: u64,
    /// Whether the latest flush id is known to be stored.
    fulfilled: bool,
    /// The last stored flush id observed.
    previous_stored_flush_id: u64,
    /// The prover id observed first.
    prover_id: Option<String>,
}

impl FlushState {
    fn update_and_check_prover_id(&mut self, prover_id: &str) -> Result<(), SyncError> {
        match self.prover_id.as_deref() {
            None => {
                tracing::info!(target: "zkevm::synchronizer", prover_id, "current prover id");
                self.prover_id = Some(prover_id.to_string());
                Ok(())
            }
            Some(previous) if previous != prover_id => {
                tracing::error!(target: "zkevm::synchronizer", previous, current = prover_id, "execution engine restarted");
                Err(SyncError::ProverRestarted {
                    previous: previous.to_string(),
                    current: prover_id.to_string(),
                })
            }
            Some(_) => Ok(()),
        }
    }
}

/// The [`DurabilityGate`] of the synchronizer, polling a [`FlushIdSource`] until the pending flush
/// id is stored.
#[derive(Debug)]
pub struct FlushIdController<F> {
    source: F,
    interval: Duration,
    cancellation: CancellationToken,
    state: Mutex<FlushState>,
}

impl<F: FlushIdSource> FlushIdController<F> {
    /// Returns a new [`FlushIdController`] polling the source at the provided interval.
    pub fn new(source: F, interval: Duration, cancellation: CancellationToken) -> Self {
        Self { source, interval, cancellation, state: Mutex::new(FlushState::default()) }
    }

    /// Returns the latest pending flush id and whether it is stored.
    pub async fn latest_flush_id(&self) -> (u64, bool) {
        let state = self.state.lock().await;
        (state.latest_flush_id, state.fulfilled)
    }
}

#[async_trait::async_trait]
impl<F: FlushIdSource> DurabilityGate for FlushIdController<F> {
    async fn pending_flush_id(&self, flush_id: u64, prover_id: &str) -> Result<(), SyncError> {
        tracing::debug!(target: "zkevm::synchronizer", flush_id, "pending flush id");
        if flush_id == 0 {
            return Err(SyncError::InvalidFlushId)
        }
        let mut state = self.state.lock().await;
        state.latest_flush_id = flush_id;
        state.fulfilled = false;
        state.update_and_check_prover_id(prover_id)
    }

    async fn check_flush_id(&self) -> Result<(), SyncError> {
        let mut state = self.state.lock().await;
        if state.fulfilled {
            return Ok(())
        }

        let mut stored = self.source.stored_flush_id().await?;
        state.update_and_check_prover_id(&stored.prover_id)?;
        if state.previous_stored_flush_id != stored.flush_id {
            tracing::info!(target: "zkevm::synchronizer", stored_flush_id = stored.flush_id, prover_id = %stored.prover_id, "stored flush id updated");
        }
        state.previous_stored_flush_id = stored.flush_id;

        if stored.flush_id < state.latest_flush_id {
            tracing::info!(
                target: "zkevm::synchronizer",
                pending = state.latest_flush_id,
                stored = stored.flush_id,
                "waiting for the flush id to be stored"
            );
            let start = Instant::now();
            let mut iterations = 0u64;
            while stored.flush_id < state.latest_flush_id {
                tokio::select! {
                    biased;
                    _ = self.cancellation.cancelled() => return Err(SyncError::Cancelled),
                    _ = tokio::time::sleep(self.interval) => {}
                }
                stored = self.source.stored_flush_id().await?;
                iterations += 1;
            }
            state.previous_stored_flush_id = stored.flush_id;
            tracing::info!(
                target: "zkevm::synchronizer",
                flush_id = stored.flush_id,
                iterations,
                elapsed = ?start.elapsed(),
                "flush id stored"
            );
        }

        state.fulfilled = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollup_node_providers::test_utils::MockFlushIdSource;
    use std::sync::Arc;

    fn controller(source: Arc<MockFlushIdSource>) -> FlushIdController<Arc<MockFlushIdSource>> {
        FlushIdController::new(source, Duration::from_millis(10), CancellationToken::new())
    }

    #[tokio::test]
    async fn test_check_waits_for_stored_flush_id() {
        let source = Arc::new(MockFlushIdSource::new(3, "prover"));
        let gate = Arc::new(controller(source.clone()));

        gate.pending_flush_id(5, "prover").await.unwrap();
        let handle = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.check_flush_id().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());
        source.set_flush_id(5).await;

        handle.await.unwrap().unwrap();
        assert_eq!(gate.latest_flush_id().await, (5, true));
        assert!(*source.queries.lock().await > 1);
    }

    #[tokio::test]
    async fn test_fulfilled_check_does_not_query() {
        let source = Arc::new(MockFlushIdSource::new(5, "prover"));
        let gate = controller(source.clone());

        gate.pending_flush_id(5, "prover").await.unwrap();
        gate.check_flush_id().await.unwrap();
        gate.check_flush_id().await.unwrap();
        assert_eq!(*source.queries.lock().await, 1);
    }

    #[tokio::test]
    async fn test_prover_restart_is_fatal() {
        let source = Arc::new(MockFlushIdSource::new(5, "prover"));
        let gate = controller(source);

        gate.pending_flush_id(1, "prover").await.unwrap();
        let err = gate.pending_flush_id(2, "other").await.unwrap_err();
        assert!(matches!(err, SyncError::ProverRestarted { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_zero_flush_id_is_rejected() {
        let gate = controller(Arc::new(MockFlushIdSource::new(0, "prover")));
        assert!(matches!(gate.pending_flush_id(0, "prover").await, Err(SyncError::InvalidFlushId)));
    }

    #[tokio::test]
    async fn test_check_honors_cancellation() {
        let source = Arc::new(MockFlushIdSource::new(1, "prover"));
        let cancellation = CancellationToken::new();
        let gate = FlushIdController::new(source, Duration::from_millis(10), cancellation.clone());

        gate.pending_flush_id(2, "prover").await.unwrap();
        cancellation.cancel();
        assert!(matches!(gate.check_flush_id().await, Err(SyncError::Cancelled)));
        assert_eq!(gate.latest_flush_id().await, (2, false));
    }
}
