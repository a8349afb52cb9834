use super::ForkSteps;
use crate::SyncError;

use alloy_primitives::Bytes;
use rollup_node_primitives::ForkId;
use zkevm_codec::Codec;

/// The steps of batches from the Etrog fork onwards, carrying a list of L2 blocks.
///
/// The new data is the byte suffix of the remote stream, which must start with a change L2 block
/// marker.
#[derive(Debug, Default, Copy, Clone)]
pub struct EtrogSteps;

#[async_trait::async_trait]
impl ForkSteps for EtrogSteps {
    fn new_transactions(
        &self,
        stored: &[u8],
        remote: &[u8],
        fork_id: ForkId,
    ) -> Result<Bytes, SyncError> {
        let suffix = remote.get(stored.len()..).unwrap_or_default();
        let blocks = Codec::decode(suffix, fork_id)?;
        tracing::debug!(
            target: "zkevm::synchronizer",
            len = suffix.len(),
            txs = blocks.transactions_count(),
            "decoded new l2 blocks"
        );
        Ok(blocks.encode()?)
    }
}
