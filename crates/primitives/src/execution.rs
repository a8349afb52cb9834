use crate::ForkId;

use alloy_primitives::{Address, Bytes, B256};

/// The mode the execution engine runs a batch in.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ExecutionMode {
    /// Replay of a trusted batch by the synchronizer.
    #[default]
    #[display("synchronizer")]
    Synchronizer,
    /// Live sequencing of new transactions.
    #[display("sequencer")]
    Sequencer,
}

/// A request to execute a batch on the execution engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRequest {
    /// The batch number.
    pub batch_number: u64,
    /// The state root to execute on top of.
    pub old_state_root: B256,
    /// The accumulated input hash of the previous batch.
    pub old_acc_input_hash: B256,
    /// The coinbase of the batch.
    pub coinbase: Address,
    /// The batch timestamp in unix seconds.
    pub timestamp: u64,
    /// The global exit root of the batch.
    pub global_exit_root: B256,
    /// The encoded transaction stream to execute.
    pub transactions: Bytes,
    /// The fork the batch belongs to.
    pub fork_id: ForkId,
    /// The execution mode.
    pub execution_mode: ExecutionMode,
}

/// The response of the execution engine for a processed batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessBatchResponse {
    /// The state root after execution.
    pub new_state_root: B256,
    /// The accumulated input hash after execution.
    pub new_acc_input_hash: B256,
    /// The local exit root after execution.
    pub new_local_exit_root: B256,
    /// The flush id the engine assigned to the changes of this execution.
    pub flush_id: u64,
    /// The identifier of the running prover instance.
    pub prover_id: String,
    /// The per block results.
    pub block_responses: Vec<ProcessBlockResponse>,
    /// The engine failed at the executor level.
    pub is_executor_level_error: bool,
    /// The batch ran out of counters.
    pub is_rom_ooc_error: bool,
}

impl ProcessBatchResponse {
    /// Returns an iterator over every transaction response of the batch.
    pub fn transactions(&self) -> impl Iterator<Item = &ProcessTransactionResponse> {
        self.block_responses.iter().flat_map(|b| b.transaction_responses.iter())
    }

    /// Returns true if the response signals a failed execution, in which case none of its results
    /// should be persisted.
    pub const fn is_failed_execution(&self) -> bool {
        self.is_executor_level_error || self.is_rom_ooc_error
    }
}

/// The result of executing an L2 block of a batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessBlockResponse {
    /// The L2 block number.
    pub block_number: u64,
    /// The per transaction results.
    pub transaction_responses: Vec<ProcessTransactionResponse>,
}

/// The result of executing a single transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessTransactionResponse {
    /// The transaction hash.
    pub tx_hash: B256,
    /// The encoded transaction.
    pub encoded: Bytes,
    /// The effective gas price percentage applied.
    pub effective_percentage: u8,
    /// The state root after the transaction.
    pub state_root: B256,
    /// The execution error code reported by the engine.
    pub rom_error: RomError,
}

/// The execution error codes reported by the execution engine per transaction.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum RomError {
    /// Unspecified error.
    Unspecified = 0,
    /// Execution finished without error.
    #[default]
    NoError = 1,
    /// Out of gas.
    OutOfGas = 2,
    /// Stack overflow.
    StackOverflow = 3,
    /// Stack underflow.
    StackUnderflow = 4,
    /// Max code size exceeded.
    MaxCodeSizeExceeded = 5,
    /// Contract address collision.
    ContractAddressCollision = 6,
    /// Execution reverted.
    ExecutionReverted = 7,
    /// Out of step counters.
    OutOfCountersStep = 8,
    /// Out of keccak counters.
    OutOfCountersKeccak = 9,
    /// Out of binary counters.
    OutOfCountersBinary = 10,
    /// Out of memory counters.
    OutOfCountersMem = 11,
    /// Out of arith counters.
    OutOfCountersArith = 12,
    /// Out of padding counters.
    OutOfCountersPadding = 13,
    /// Out of poseidon counters.
    OutOfCountersPoseidon = 14,
    /// Invalid jump.
    InvalidJump = 15,
    /// Invalid opcode.
    InvalidOpcode = 16,
    /// Invalid static call.
    InvalidStatic = 17,
    /// Bytecode starting with 0xEF.
    InvalidBytecodeStartsEf = 18,
    /// Intrinsic check: invalid signature.
    IntrinsicInvalidSignature = 19,
    /// Intrinsic check: invalid chain id.
    IntrinsicInvalidChainId = 20,
    /// Intrinsic check: invalid nonce.
    IntrinsicInvalidNonce = 21,
    /// Intrinsic check: invalid gas limit.
    IntrinsicInvalidGasLimit = 22,
    /// Intrinsic check: invalid balance.
    IntrinsicInvalidBalance = 23,
    /// Intrinsic check: batch gas limit exceeded.
    IntrinsicInvalidBatchGasLimit = 24,
    /// Intrinsic check: sender has code.
    IntrinsicInvalidSenderCode = 25,
    /// Intrinsic check: gas limit times gas price overflows.
    IntrinsicTxGasOverflow = 26,
    /// The batch data is too big.
    BatchDataTooBig = 27,
    /// The transaction could not be RLP decoded.
    InvalidRlp = 28,
}

impl RomError {
    /// Returns true if the error comes from an intrinsic transaction check.
    pub const fn is_intrinsic(self) -> bool {
        matches!(
            self,
            Self::IntrinsicInvalidSignature |
                Self::IntrinsicInvalidChainId |
                Self::IntrinsicInvalidNonce |
                Self::IntrinsicInvalidGasLimit |
                Self::IntrinsicInvalidBalance |
                Self::IntrinsicInvalidBatchGasLimit |
                Self::IntrinsicInvalidSenderCode |
                Self::IntrinsicTxGasOverflow
        )
    }

    /// Returns true if the error signals the batch ran out of counters.
    pub const fn is_out_of_counters(self) -> bool {
        matches!(
            self,
            Self::OutOfCountersStep |
                Self::OutOfCountersKeccak |
                Self::OutOfCountersBinary |
                Self::OutOfCountersMem |
                Self::OutOfCountersArith |
                Self::OutOfCountersPadding |
                Self::OutOfCountersPoseidon
        )
    }

    /// Returns true if a transaction ending with this error modified the state root. Reverted
    /// transactions still consume gas and bump the nonce, rejected ones leave no trace.
    pub const fn changes_state_root(self) -> bool {
        !self.is_intrinsic() && !self.is_out_of_counters() && !matches!(self, Self::InvalidRlp)
    }
}

impl TryFrom<u32> for RomError {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Unspecified,
            1 => Self::NoError,
            2 => Self::OutOfGas,
            3 => Self::StackOverflow,
            4 => Self::StackUnderflow,
            5 => Self::MaxCodeSizeExceeded,
            6 => Self::ContractAddressCollision,
            7 => Self::ExecutionReverted,
            8 => Self::OutOfCountersStep,
            9 => Self::OutOfCountersKeccak,
            10 => Self::OutOfCountersBinary,
            11 => Self::OutOfCountersMem,
            12 => Self::OutOfCountersArith,
            13 => Self::OutOfCountersPadding,
            14 => Self::OutOfCountersPoseidon,
            15 => Self::InvalidJump,
            16 => Self::InvalidOpcode,
            17 => Self::InvalidStatic,
            18 => Self::InvalidBytecodeStartsEf,
            19 => Self::IntrinsicInvalidSignature,
            20 => Self::IntrinsicInvalidChainId,
            21 => Self::IntrinsicInvalidNonce,
            22 => Self::IntrinsicInvalidGasLimit,
            23 => Self::IntrinsicInvalidBalance,
            24 => Self::IntrinsicInvalidBatchGasLimit,
            25 => Self::IntrinsicInvalidSenderCode,
            26 => Self::IntrinsicTxGasOverflow,
            27 => Self::BatchDataTooBig,
            28 => Self::InvalidRlp,
            other => return Err(other),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_root_changing_errors() {
        assert!(RomError::NoError.changes_state_root());
        assert!(RomError::ExecutionReverted.changes_state_root());
        assert!(RomError::OutOfGas.changes_state_root());

        assert!(!RomError::IntrinsicInvalidNonce.changes_state_root());
        assert!(!RomError::OutOfCountersKeccak.changes_state_root());
        assert!(!RomError::InvalidRlp.changes_state_root());
    }

    #[test]
    fn test_rom_error_codes() {
        for code in 0..=28u32 {
            let err = RomError::try_from(code).unwrap();
            assert_eq!(err as u32, code);
        }
        assert_eq!(RomError::try_from(29), Err(29));
    }

    #[test]
    fn test_failed_execution_flags() {
        let mut response = ProcessBatchResponse::default();
        assert!(!response.is_failed_execution());
        response.is_rom_ooc_error = true;
        assert!(response.is_failed_execution());
    }
}
