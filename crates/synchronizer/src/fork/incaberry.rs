use super::ForkSteps;
use crate::SyncError;

use alloy_primitives::Bytes;
use rollup_node_primitives::ForkId;
use zkevm_codec::{decoding::v1::encode_v1, Codec, RawTransaction};

/// The steps of batches preceding the Etrog fork, carrying a flat list of transactions.
///
/// New transactions are found by decoding both streams and keeping the remote transactions past
/// the stored ones.
#[derive(Debug, Default, Copy, Clone)]
pub struct IncaberrySteps;

#[async_trait::async_trait]
impl ForkSteps for IncaberrySteps {
    fn new_transactions(
        &self,
        stored: &[u8],
        remote: &[u8],
        fork_id: ForkId,
    ) -> Result<Bytes, SyncError> {
        let stored = Codec::decode(stored, fork_id)?;
        let remote = Codec::decode(remote, fork_id)?;
        tracing::debug!(
            target: "zkevm::synchronizer",
            stored = stored.transactions_count(),
            remote = remote.transactions_count(),
            "decoded stored and remote transactions"
        );

        let suffix: Vec<RawTransaction> =
            remote.transactions().skip(stored.transactions_count()).cloned().collect();
        Ok(encode_v1(&suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::raw_transaction;
    use zkevm_codec::BatchL2Data;

    #[test]
    fn test_new_transactions_are_the_remote_suffix() {
        let txs: Vec<_> = (0..3).map(|i| raw_transaction(i, Some(255))).collect();
        let stored = encode_v1(&txs[..1]);
        let remote = encode_v1(&txs);

        let new = IncaberrySteps.new_transactions(&stored, &remote, ForkId::INCABERRY).unwrap();
        assert_eq!(new, encode_v1(&txs[1..]));

        let BatchL2Data::V1(decoded) = Codec::decode(&new, ForkId::INCABERRY).unwrap() else {
            panic!("expected v1 data")
        };
        assert_eq!(decoded.len(), 2);
    }
}
