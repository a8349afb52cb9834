//! Consistency checks between the local trusted state and the batches reported by the trusted
//! sequencer.

use crate::SyncError;

use alloy_primitives::{Address, B256};
use rollup_node_primitives::{Batch, ProcessBatchResponse};
use std::fmt;

/// Options for [`compare_batches`].
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct CompareOptions {
    /// Skip the timestamp comparison.
    pub ignore_timestamp: bool,
}

impl CompareOptions {
    /// Compare every field but the timestamp.
    pub const fn ignore_timestamp() -> Self {
        Self { ignore_timestamp: true }
    }
}

/// Returns the names of the fields that differ between the two batches.
pub fn compare_batches(local: &Batch, remote: &Batch, options: CompareOptions) -> Vec<&'static str> {
    let mut diff = Vec::new();
    if local.number != remote.number {
        diff.push("number");
    }
    if local.coinbase != remote.coinbase {
        diff.push("coinbase");
    }
    if local.global_exit_root != remote.global_exit_root {
        diff.push("global_exit_root");
    }
    if local.local_exit_root != remote.local_exit_root {
        diff.push("local_exit_root");
    }
    if local.state_root != remote.state_root {
        diff.push("state_root");
    }
    if local.acc_input_hash != remote.acc_input_hash {
        diff.push("acc_input_hash");
    }
    if !options.ignore_timestamp && local.timestamp != remote.timestamp {
        diff.push("timestamp");
    }
    if local.batch_l2_data != remote.batch_l2_data {
        diff.push("batch_l2_data");
    }
    if local.forced_batch_number != remote.forced_batch_number {
        diff.push("forced_batch_number");
    }
    diff
}

/// Returns true if the local batch is bit for bit identical to the remote one.
pub fn is_synced(local: &Batch, remote: &Batch) -> bool {
    compare_batches(local, remote, CompareOptions::default()).is_empty()
}

/// The diagnostic record of a batch inconsistency, carrying both views of the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDiagnostics {
    /// The number of the batch.
    pub batch_number: u64,
    /// The detected inconsistency.
    pub reason: String,
    /// The fields differing between the local and the remote batch.
    pub differing_fields: Vec<&'static str>,
    /// The local view of the batch, if any.
    pub local: Option<BatchSummary>,
    /// The remote view of the batch.
    pub remote: BatchSummary,
    /// The state root computed by the execution engine, if any.
    pub computed_state_root: Option<B256>,
}

impl BatchDiagnostics {
    fn new(local: Option<&Batch>, remote: &Batch, reason: impl Into<String>) -> Self {
        let differing_fields = local
            .map(|local| compare_batches(local, remote, CompareOptions::default()))
            .unwrap_or_default();
        Self {
            batch_number: remote.number,
            reason: reason.into(),
            differing_fields,
            local: local.map(BatchSummary::from),
            remote: remote.into(),
            computed_state_root: None,
        }
    }

    const fn with_computed_state_root(mut self, root: B256) -> Self {
        self.computed_state_root = Some(root);
        self
    }

    /// Logs the diagnostics and returns them as a [`SyncError::Inconsistency`].
    fn into_error(self) -> SyncError {
        tracing::error!(
            target: "zkevm::synchronizer",
            batch_number = self.batch_number,
            reason = %self.reason,
            differing_fields = ?self.differing_fields,
            local = ?self.local,
            remote = ?self.remote,
            computed_state_root = ?self.computed_state_root,
            "trusted state inconsistency"
        );
        self.into()
    }
}

impl fmt::Display for BatchDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch {}: {}", self.batch_number, self.reason)?;
        if !self.differing_fields.is_empty() {
            write!(f, " (differing fields: {})", self.differing_fields.join(", "))?;
        }
        Ok(())
    }
}

/// The fields of a batch reported in a [`BatchDiagnostics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// The coinbase.
    pub coinbase: Address,
    /// The global exit root.
    pub global_exit_root: B256,
    /// The local exit root.
    pub local_exit_root: B256,
    /// The state root.
    pub state_root: B256,
    /// The accumulated input hash.
    pub acc_input_hash: B256,
    /// The timestamp.
    pub timestamp: u64,
    /// The length of the raw transaction stream.
    pub batch_l2_data_len: usize,
    /// The forced batch number.
    pub forced_batch_number: Option<u64>,
}

impl From<&Batch> for BatchSummary {
    fn from(batch: &Batch) -> Self {
        Self {
            coinbase: batch.coinbase,
            global_exit_root: batch.global_exit_root,
            local_exit_root: batch.local_exit_root,
            state_root: batch.state_root,
            acc_input_hash: batch.acc_input_hash,
            timestamp: batch.timestamp,
            batch_l2_data_len: batch.batch_l2_data.len(),
            forced_batch_number: batch.forced_batch_number,
        }
    }
}

/// Checks the remote batch against the local one before any processing.
///
/// The remote batch cannot be open when the local one is closed, and the local raw transaction
/// stream cannot be longer than the remote one.
pub fn check_inconsistency(local: Option<&Batch>, remote: &Batch) -> Result<(), SyncError> {
    let Some(local) = local else { return Ok(()) };

    if remote.is_open() && local.is_closed() {
        return Err(BatchDiagnostics::new(
            Some(local),
            remote,
            "remote batch is open but the local batch is closed",
        )
        .into_error())
    }
    if local.batch_l2_data.len() > remote.batch_l2_data.len() {
        return Err(BatchDiagnostics::new(
            Some(local),
            remote,
            format!(
                "local batch l2 data is longer than remote: {} > {}",
                local.batch_l2_data.len(),
                remote.batch_l2_data.len()
            ),
        )
        .into_error())
    }
    Ok(())
}

/// Checks that the stored raw transaction stream is a prefix of the remote one.
///
/// Returns true if the remote stream carries new data, false if both streams are equal.
pub fn check_incremental_data(stored: &Batch, remote: &Batch) -> Result<bool, SyncError> {
    let stored_data = &stored.batch_l2_data;
    let remote_data = &remote.batch_l2_data;
    if !remote_data.starts_with(stored_data) {
        let reason = if stored_data.len() == remote_data.len() {
            "batch l2 data of equal length differs"
        } else {
            "stored batch l2 data is not a prefix of the remote batch l2 data"
        };
        return Err(BatchDiagnostics::new(Some(stored), remote, reason).into_error())
    }
    Ok(remote_data.len() > stored_data.len())
}

/// Checks the execution result of a closed remote batch: the computed state root must be
/// non-zero and match the remote state root, and the computed local exit root must match the
/// remote one. Open batches are not checked.
pub fn check_execution_result(
    local: Option<&Batch>,
    remote: &Batch,
    response: &ProcessBatchResponse,
) -> Result<(), SyncError> {
    if remote.is_open() {
        return Ok(())
    }

    let reason = if response.new_state_root.is_zero() {
        Some("computed state root is zero")
    } else if response.new_state_root != remote.state_root {
        Some("computed state root differs from the remote state root")
    } else if response.new_local_exit_root != remote.local_exit_root {
        Some("computed local exit root differs from the remote local exit root")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(BatchDiagnostics::new(local, remote, reason)
            .with_computed_state_root(response.new_state_root)
            .into_error()),
        None => Ok(()),
    }
}

/// Checks that the applied state root matches the root of the closed remote batch when no new
/// transactions have to be executed.
pub fn check_applied_state_root(
    local: &Batch,
    remote: &Batch,
    applied_state_root: B256,
) -> Result<(), SyncError> {
    if remote.is_closed() && applied_state_root != remote.state_root {
        return Err(BatchDiagnostics::new(
            Some(local),
            remote,
            "applied state root differs from the remote state root",
        )
        .with_computed_state_root(applied_state_root)
        .into_error())
    }
    Ok(())
}

/// Checks a batch found already closed in the local state against the remote batch, ignoring the
/// timestamp.
pub fn check_already_closed(stored: &Batch, remote: &Batch) -> Result<(), SyncError> {
    let diff = compare_batches(stored, remote, CompareOptions::ignore_timestamp());
    if !diff.is_empty() {
        return Err(BatchDiagnostics::new(
            Some(stored),
            remote,
            "batch already closed with different values",
        )
        .into_error())
    }
    Ok(())
}
