use crate::{cache::BatchWindow, verify, SyncError};

use alloy_primitives::B256;
use rollup_node_primitives::Batch;
use strum::EnumIter;

/// The processing path of a remote trusted batch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumIter)]
pub enum Classification {
    /// The local batch is identical to the remote batch.
    AlreadySynced,
    /// The batch is unknown locally and is replayed from scratch.
    FullReplay,
    /// The local batch is open but its applied state root was lost, it is discarded and
    /// replayed from scratch.
    Reprocess,
    /// The local batch is open and only the new transactions are replayed.
    Incremental,
}

impl Classification {
    /// Returns the str representation of the [`Classification`].
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadySynced => "already_synced",
            Self::FullReplay => "full_replay",
            Self::Reprocess => "reprocess",
            Self::Incremental => "incremental",
        }
    }
}

/// Classifies the remote batch against the local [`BatchWindow`] and the state root resolved
/// for the batch.
///
/// An open local batch executed on top of the previous batch's root has lost its intermediate
/// root and is reprocessed.
pub fn classify(window: &BatchWindow, state_root: Option<B256>, remote: &Batch) -> Classification {
    let Some(current) = window.current.as_ref() else { return Classification::FullReplay };

    if verify::is_synced(current, remote) {
        return Classification::AlreadySynced
    }

    let root_is_previous = window
        .previous
        .as_ref()
        .zip(state_root)
        .is_some_and(|(previous, root)| previous.state_root == root);
    if current.is_open() && root_is_previous {
        return Classification::Reprocess
    }

    Classification::Incremental
}

/// Options adjusting the [`Classification`] of remote batches.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ClassifyOptions {
    /// Replays an open local batch from scratch once the remote batch is closed, instead of
    /// executing only its new transactions.
    pub reprocess_full_batch_on_close: bool,
    /// Accepts remote batches closed without any transaction.
    pub accept_empty_closed_batches: bool,
}

/// Applies the [`ClassifyOptions`] to the classification of the remote batch.
///
/// Returns [`SyncError::EmptyClosedBatch`] for a closed remote batch without data unless such
/// batches are accepted.
pub fn apply_options(
    classification: Classification,
    window: &BatchWindow,
    remote: &Batch,
    options: ClassifyOptions,
) -> Result<Classification, SyncError> {
    if remote.is_closed() && remote.batch_l2_data.is_empty() && !options.accept_empty_closed_batches
    {
        tracing::warn!(target: "zkevm::synchronizer", batch_number = remote.number, "rejecting empty closed batch");
        return Err(SyncError::EmptyClosedBatch(remote.number))
    }

    let local_open = window.current.as_ref().is_some_and(Batch::is_open);
    if options.reprocess_full_batch_on_close &&
        remote.is_closed() &&
        local_open &&
        matches!(classification, Classification::Incremental | Classification::AlreadySynced)
    {
        tracing::info!(
            target: "zkevm::synchronizer",
            batch_number = remote.number,
            from = classification.as_str(),
            "remote batch closed, reprocessing full batch"
        );
        return Ok(Classification::Reprocess)
    }

    Ok(classification)
}
