use alloy_primitives::{Address, Bytes, B256, U64};
use alloy_rpc_client::RpcClient;
use alloy_transport::{layers::RetryBackoffLayer, RpcError, TransportErrorKind};
use rollup_node_primitives::Batch;

/// An error occurring while querying the trusted sequencer.
#[derive(Debug, thiserror::Error)]
pub enum SequencerClientError {
    /// An error occurred at the transport layer.
    #[error("transport error: {0}")]
    Rpc(#[from] RpcError<TransportErrorKind>),
    /// The sequencer does not know the requested batch.
    #[error("batch {0} not found on trusted sequencer")]
    BatchNotFound(u64),
}

/// Implementers of the trait can provide the trusted batches reported by the sequencer.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait TrustedSequencerClient: Send + Sync {
    /// Returns the number of the latest batch known to the sequencer.
    async fn batch_number(&self) -> Result<u64, SequencerClientError>;

    /// Returns the batch with the provided number.
    async fn batch_by_number(&self, batch_number: u64) -> Result<Batch, SequencerClientError>;
}

/// The batch as returned by the `zkevm_getBatchByNumber` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBatch {
    /// The batch number.
    pub number: U64,
    /// The coinbase of the batch.
    pub coinbase: Address,
    /// The state root, intermediate while the batch is open.
    pub state_root: B256,
    /// The global exit root.
    pub global_exit_root: B256,
    /// The local exit root.
    pub local_exit_root: B256,
    /// The accumulated input hash.
    pub acc_input_hash: B256,
    /// The batch timestamp.
    pub timestamp: U64,
    /// The raw transaction stream.
    pub batch_l2_data: Bytes,
    /// The forced batch number, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forced_batch_number: Option<U64>,
    /// Whether the sequencer closed the batch.
    #[serde(default)]
    pub closed: bool,
}

impl From<RpcBatch> for Batch {
    fn from(value: RpcBatch) -> Self {
        // the final roots of an open batch are not known yet.
        let (state_root, local_exit_root, acc_input_hash) = if value.closed {
            (value.state_root, value.local_exit_root, value.acc_input_hash)
        } else {
            (B256::ZERO, B256::ZERO, B256::ZERO)
        };
        Self {
            number: value.number.to(),
            coinbase: value.coinbase,
            global_exit_root: value.global_exit_root,
            local_exit_root,
            state_root,
            acc_input_hash,
            timestamp: value.timestamp.to(),
            batch_l2_data: value.batch_l2_data,
            forced_batch_number: value.forced_batch_number.map(|n| n.to()),
        }
    }
}

/// A [`TrustedSequencerClient`] querying the sequencer's JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct RpcTrustedSequencerClient {
    /// The inner rpc client.
    client: RpcClient,
}

impl RpcTrustedSequencerClient {
    /// Returns a new [`RpcTrustedSequencerClient`] from the provided [`RpcClient`].
    pub const fn new(client: RpcClient) -> Self {
        Self { client }
    }

    /// Returns a new [`RpcTrustedSequencerClient`] over http, retrying rate limited requests with
    /// a backoff.
    pub fn new_http(url: reqwest::Url, max_retries: u32, initial_backoff_ms: u64) -> Self {
        let retry_layer = RetryBackoffLayer::new(max_retries, initial_backoff_ms, 330);
        Self { client: RpcClient::builder().layer(retry_layer).http(url) }
    }
}

#[async_trait::async_trait]
impl TrustedSequencerClient for RpcTrustedSequencerClient {
    async fn batch_number(&self) -> Result<u64, SequencerClientError> {
        tracing::trace!(target: "zkevm::providers", "fetching trusted batch number");
        let number: U64 = self.client.request_noparams("zkevm_batchNumber").await?;
        Ok(number.to())
    }

    async fn batch_by_number(&self, batch_number: u64) -> Result<Batch, SequencerClientError> {
        tracing::trace!(target: "zkevm::providers", batch_number, "fetching trusted batch");
        let batch: Option<RpcBatch> = self
            .client
            .request("zkevm_getBatchByNumber", (U64::from(batch_number), false))
            .await?;
        batch.map(Into::into).ok_or(SequencerClientError::BatchNotFound(batch_number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_deserialize_closed_batch() -> eyre::Result<()> {
        let json = serde_json::json!({
            "number": "0x2a",
            "coinbase": "0x148ee7daf16574cd020afa34cc658f8f3fbd2800",
            "stateRoot": "0x0101010101010101010101010101010101010101010101010101010101010101",
            "globalExitRoot": "0x0202020202020202020202020202020202020202020202020202020202020202",
            "localExitRoot": "0x0303030303030303030303030303030303030303030303030303030303030303",
            "accInputHash": "0x0404040404040404040404040404040404040404040404040404040404040404",
            "timestamp": "0x65a0b1c2",
            "batchL2Data": "0x0b00000003",
            "closed": true
        });
        let batch: Batch = serde_json::from_value::<RpcBatch>(json)?.into();

        assert_eq!(batch.number, 42);
        assert_eq!(batch.state_root, B256::repeat_byte(1));
        assert_eq!(batch.acc_input_hash, B256::repeat_byte(4));
        assert_eq!(batch.timestamp, 0x65a0b1c2);
        assert_eq!(batch.batch_l2_data.len(), 5);
        assert!(batch.forced_batch_number.is_none());
        assert!(batch.is_closed());

        Ok(())
    }

    #[test]
    fn test_open_batch_has_no_final_roots() -> eyre::Result<()> {
        let json = serde_json::json!({
            "number": "0x2b",
            "coinbase": "0x148ee7daf16574cd020afa34cc658f8f3fbd2800",
            "stateRoot": "0x0101010101010101010101010101010101010101010101010101010101010101",
            "globalExitRoot": "0x0202020202020202020202020202020202020202020202020202020202020202",
            "localExitRoot": "0x0303030303030303030303030303030303030303030303030303030303030303",
            "accInputHash": "0x0404040404040404040404040404040404040404040404040404040404040404",
            "timestamp": "0x1",
            "batchL2Data": "0x",
            "forcedBatchNumber": "0x3",
            "closed": false
        });
        let batch: Batch = serde_json::from_value::<RpcBatch>(json)?.into();

        assert!(batch.is_open());
        assert_eq!(batch.local_exit_root, B256::ZERO);
        assert_eq!(batch.global_exit_root, B256::repeat_byte(2));
        assert_eq!(batch.forced_batch_number, Some(3));

        Ok(())
    }
}
