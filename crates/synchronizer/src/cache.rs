use alloy_primitives::B256;
use rollup_node_primitives::Batch;

/// The local view of a trusted batch and its predecessor.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchWindow {
    /// The local batch with the number being synchronized, if any.
    pub current: Option<Batch>,
    /// The local batch preceding it, if any.
    pub previous: Option<Batch>,
}

impl BatchWindow {
    /// Returns a new [`BatchWindow`].
    pub const fn new(current: Option<Batch>, previous: Option<Batch>) -> Self {
        Self { current, previous }
    }
}

/// A state root applied by the execution engine, with the batch it was applied for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AppliedStateRoot {
    /// The batch the root was applied for.
    pub batch_number: u64,
    /// The state root.
    pub state_root: B256,
}

/// The in-memory trusted state: the last two processed batches and the latest applied state root.
///
/// The cache is an accelerator, on a miss the batches are read from the local state. The applied
/// state root of an open batch only lives here, losing it forces the batch to be reprocessed.
#[derive(Debug, Default)]
pub struct TrustedStateCache {
    current: Option<Batch>,
    previous: Option<Batch>,
    applied_state_root: Option<AppliedStateRoot>,
}

impl TrustedStateCache {
    /// Returns the cached batch with the provided number, if any.
    pub fn get(&self, batch_number: u64) -> Option<&Batch> {
        [self.current.as_ref(), self.previous.as_ref()]
            .into_iter()
            .flatten()
            .find(|batch| batch.number == batch_number)
    }

    /// Returns the last applied state root.
    pub const fn applied_state_root(&self) -> Option<AppliedStateRoot> {
        self.applied_state_root
    }

    /// Drops every cached entry.
    pub fn clear(&mut self) {
        tracing::debug!(target: "zkevm::synchronizer", "clearing trusted state cache");
        *self = Self::default();
    }

    /// Returns the cached [`BatchWindow`] for the provided batch number, or `None` if the cache
    /// does not hold the batch.
    pub fn window(&self, batch_number: u64) -> Option<BatchWindow> {
        let current = self.current.as_ref().filter(|b| b.number == batch_number)?;
        let previous =
            self.previous.as_ref().filter(|b| Some(b.number) == batch_number.checked_sub(1));
        Some(BatchWindow::new(Some(current.clone()), previous.cloned()))
    }

    /// Returns the cached batch preceding the provided batch number, if any.
    pub fn predecessor(&self, batch_number: u64) -> Option<&Batch> {
        let number = batch_number.checked_sub(1)?;
        self.current.as_ref().filter(|b| b.number == number)
    }

    /// Records a processed batch and the state root applied for it.
    ///
    /// The processed batch becomes the current entry. The prior current entry becomes the previous
    /// one, unless the same batch was processed again.
    pub fn update(&mut self, batch: Batch, state_root: B256) {
        tracing::trace!(target: "zkevm::synchronizer", batch_number = batch.number, ?state_root, "updating trusted state cache");
        self.applied_state_root =
            Some(AppliedStateRoot { batch_number: batch.number, state_root });
        match self.current.take() {
            Some(current) if current.number == batch.number => {}
            Some(current) if Some(current.number) == batch.number.checked_sub(1) => {
                self.previous = Some(current)
            }
            _ => self.previous = None,
        }
        self.current = Some(batch);
    }

    /// Resolves the state root the provided batch should be executed on top of.
    ///
    /// A closed local batch yields its own root. Otherwise the cached applied root is used when it
    /// belongs to the batch or to its predecessor, falling back to the root of the previous local
    /// batch when the batch is open or missing locally.
    pub fn resolve_state_root(&self, batch_number: u64, window: &BatchWindow) -> Option<B256> {
        if let Some(current) = window.current.as_ref().filter(|b| b.is_closed()) {
            return Some(current.state_root)
        }
        let cached = self.applied_state_root.filter(|applied| {
            applied.batch_number == batch_number ||
                Some(applied.batch_number) == batch_number.checked_sub(1)
        });
        match cached {
            Some(applied) => Some(applied.state_root),
            None => window.previous.as_ref().map(|b| b.state_root),
        }
    }
}
