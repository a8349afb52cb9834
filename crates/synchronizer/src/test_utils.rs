//! Test utils for the trusted state synchronizer.

use alloy_primitives::{keccak256, B256};
use alloy_rlp::{Encodable, Header};
use rollup_node_primitives::{
    Batch, ProcessBatchResponse, ProcessBlockResponse, ProcessRequest,
    ProcessTransactionResponse, RomError,
};
use rollup_node_providers::{BatchExecutor, ExecutorError, FlushIdSource, StoredFlushId};
use std::collections::HashMap;
use tokio::sync::Mutex;
use zkevm_codec::{BatchL2Data, Codec, RawTransaction};

/// The prover id reported by the [`MockBatchExecutor`].
pub const MOCK_PROVER_ID: &str = "mock-prover";

/// Returns a raw legacy transaction with the provided nonce.
pub fn raw_transaction(nonce: u64, effective_percentage: Option<u8>) -> RawTransaction {
    let mut payload = Vec::new();
    nonce.encode(&mut payload);
    [0xaa_u8; 20].encode(&mut payload);
    let mut rlp = Vec::new();
    Header { list: true, payload_length: payload.len() }.encode(&mut rlp);
    rlp.extend(payload);

    RawTransaction {
        rlp: rlp.into(),
        r: B256::repeat_byte(0x11),
        s: B256::repeat_byte(0x22),
        v: 0x1b,
        effective_percentage,
    }
}

/// Returns the state root of executing the provided transactions on top of the root.
pub fn state_root_after<'a>(
    old_state_root: B256,
    transactions: impl IntoIterator<Item = &'a RawTransaction>,
) -> B256 {
    transactions.into_iter().fold(old_state_root, |root, tx| {
        let mut buf = root.to_vec();
        tx.encode(&mut buf);
        keccak256(buf)
    })
}

/// Returns the local exit root reported by the [`MockBatchExecutor`] for a state root.
pub fn local_exit_root(state_root: B256) -> B256 {
    keccak256(state_root)
}

/// Returns a closed genesis batch.
pub fn genesis() -> Batch {
    Batch {
        number: 0,
        state_root: B256::repeat_byte(0x01),
        local_exit_root: B256::repeat_byte(0x02),
        acc_input_hash: B256::repeat_byte(0x03),
        ..Default::default()
    }
}

/// Returns the remote view of a batch carrying the provided data, closed on top of the provided
/// root if `closed_on` is set.
pub fn remote_batch(number: u64, data: &BatchL2Data, closed_on: Option<B256>) -> Batch {
    let batch_l2_data = data.encode().expect("valid data");
    let mut batch = Batch {
        number,
        timestamp: 1_000 + number,
        global_exit_root: B256::repeat_byte(0x44),
        batch_l2_data,
        ..Default::default()
    };
    if let Some(old_root) = closed_on {
        batch.state_root = state_root_after(old_root, data.transactions());
        batch.local_exit_root = local_exit_root(batch.state_root);
        batch.acc_input_hash = keccak256(batch.state_root.as_slice());
    }
    batch
}

/// A failure injected in the [`MockBatchExecutor`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MockFailure {
    /// The engine returns an error.
    Error,
    /// The engine reports an executor level error.
    ExecutorLevel,
    /// The engine reports the batch ran out of counters.
    OutOfCounters,
}

#[derive(Debug, Default)]
struct MockExecutorState {
    flush_id: u64,
    l2_block_number: u64,
}

/// A [`BatchExecutor`] chaining the state root with the hash of every executed transaction.
///
/// The engine also acts as the [`FlushIdSource`], reporting every flush id as stored.
#[derive(Debug, Default)]
pub struct MockBatchExecutor {
    /// The requests received.
    pub requests: Mutex<Vec<ProcessRequest>>,
    /// The execution errors reported per transaction hash.
    pub rom_errors: Mutex<HashMap<B256, RomError>>,
    /// The failure to inject in the next executions.
    pub failure: Mutex<Option<MockFailure>>,
    state: Mutex<MockExecutorState>,
}

impl MockBatchExecutor {
    /// Returns the transactions count of every received request.
    pub async fn executed_transactions(&self) -> Vec<usize> {
        self.requests
            .lock()
            .await
            .iter()
            .map(|r| {
                Codec::decode(&r.transactions, r.fork_id)
                    .map(|d| d.transactions_count())
                    .unwrap_or_default()
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl BatchExecutor for MockBatchExecutor {
    async fn process_batch(
        &self,
        request: ProcessRequest,
        update_merkle_tree: bool,
    ) -> Result<ProcessBatchResponse, ExecutorError> {
        assert!(update_merkle_tree);
        self.requests.lock().await.push(request.clone());

        let failure = *self.failure.lock().await;
        if failure == Some(MockFailure::Error) {
            return Err(ExecutorError::Unavailable("mock failure".to_string()))
        }

        let data = Codec::decode(&request.transactions, request.fork_id)
            .map_err(|err| ExecutorError::other(err.to_string()))?;
        let blocks: Vec<Vec<&RawTransaction>> = match &data {
            BatchL2Data::V1(txs) => txs.iter().map(|tx| vec![tx]).collect(),
            BatchL2Data::V2(batch) => {
                batch.blocks.iter().map(|b| b.transactions.iter().collect()).collect()
            }
        };

        let mut state = self.state.lock().await;
        let rom_errors = self.rom_errors.lock().await;
        let mut root = request.old_state_root;
        let mut block_responses = Vec::with_capacity(blocks.len());
        for txs in blocks {
            state.l2_block_number += 1;
            let mut transaction_responses = Vec::with_capacity(txs.len());
            for tx in txs {
                let mut encoded = Vec::new();
                tx.encode(&mut encoded);
                let tx_hash = keccak256(&encoded);
                let rom_error = rom_errors.get(&tx_hash).copied().unwrap_or(RomError::NoError);
                root = state_root_after(root, [tx]);
                transaction_responses.push(ProcessTransactionResponse {
                    tx_hash,
                    encoded: encoded.into(),
                    effective_percentage: tx.effective_percentage.unwrap_or(255),
                    state_root: root,
                    rom_error,
                });
            }
            block_responses
                .push(ProcessBlockResponse { block_number: state.l2_block_number, transaction_responses });
        }
        state.flush_id += 1;

        Ok(ProcessBatchResponse {
            new_state_root: root,
            new_acc_input_hash: keccak256(root.as_slice()),
            new_local_exit_root: local_exit_root(root),
            flush_id: state.flush_id,
            prover_id: MOCK_PROVER_ID.to_string(),
            block_responses,
            is_executor_level_error: failure == Some(MockFailure::ExecutorLevel),
            is_rom_ooc_error: failure == Some(MockFailure::OutOfCounters),
        })
    }
}

#[async_trait::async_trait]
impl FlushIdSource for MockBatchExecutor {
    async fn stored_flush_id(&self) -> Result<StoredFlushId, ExecutorError> {
        Ok(StoredFlushId {
            flush_id: self.state.lock().await.flush_id,
            prover_id: MOCK_PROVER_ID.to_string(),
        })
    }
}

/// Returns the V1 data of the transactions with the provided nonces.
pub fn v1_data(nonces: impl IntoIterator<Item = u64>) -> BatchL2Data {
    BatchL2Data::V1(nonces.into_iter().map(|n| raw_transaction(n, Some(255))).collect())
}
