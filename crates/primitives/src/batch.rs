use alloy_primitives::{Address, Bytes, B256};

/// A trusted batch as reported by the sequencer or stored in the local state.
///
/// A batch with a zero [`Batch::state_root`] is still open: the sequencer keeps appending
/// transactions to it. Once closed, the state root is the post-state of executing every
/// transaction of the batch on top of the previous batch's state root.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct Batch {
    /// The batch number.
    pub number: u64,
    /// The coinbase address collecting the batch fees.
    pub coinbase: Address,
    /// The global exit root used by the batch.
    pub global_exit_root: B256,
    /// The local exit root after the batch.
    pub local_exit_root: B256,
    /// The state root after the batch, zero while the batch is open.
    pub state_root: B256,
    /// The accumulated input hash.
    pub acc_input_hash: B256,
    /// The batch timestamp in unix seconds.
    pub timestamp: u64,
    /// The raw encoded transaction stream of the batch.
    pub batch_l2_data: Bytes,
    /// The forced batch number if the batch was forced through L1.
    pub forced_batch_number: Option<u64>,
}

impl Batch {
    /// Returns true if the batch is still open.
    pub fn is_open(&self) -> bool {
        self.state_root.is_zero()
    }

    /// Returns true if the batch was closed by the sequencer.
    pub fn is_closed(&self) -> bool {
        !self.is_open()
    }

    /// Returns the [`ProcessingContext`] required to open the batch.
    pub fn processing_context(&self) -> ProcessingContext {
        ProcessingContext {
            batch_number: self.number,
            coinbase: self.coinbase,
            timestamp: self.timestamp,
            global_exit_root: self.global_exit_root,
            batch_l2_data: self.batch_l2_data.clone(),
            forced_batch_number: self.forced_batch_number,
        }
    }
}

/// The context used to open a new batch in the local state.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessingContext {
    /// The number of the batch to open.
    pub batch_number: u64,
    /// The coinbase of the batch.
    pub coinbase: Address,
    /// The batch timestamp in unix seconds.
    pub timestamp: u64,
    /// The global exit root of the batch.
    pub global_exit_root: B256,
    /// The raw transaction stream known when opening.
    pub batch_l2_data: Bytes,
    /// The forced batch number, if any.
    pub forced_batch_number: Option<u64>,
}

/// The outcome of processing a batch, used to close it in the local state.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessingReceipt {
    /// The number of the batch to close.
    pub batch_number: u64,
    /// The final state root.
    pub state_root: B256,
    /// The final local exit root.
    pub local_exit_root: B256,
    /// The accumulated input hash.
    pub acc_input_hash: B256,
    /// The complete raw transaction stream of the batch.
    pub batch_l2_data: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbitrary::{Arbitrary, Unstructured};
    use rand::Rng;

    #[test]
    fn test_batch_open_iff_zero_root() {
        let mut bytes = [0u8; 1024];
        rand::rng().fill(bytes.as_mut_slice());
        let mut u = Unstructured::new(&bytes);

        let mut batch = Batch::arbitrary(&mut u).unwrap();
        batch.state_root = B256::ZERO;
        assert!(batch.is_open());
        assert!(!batch.is_closed());

        batch.state_root = B256::repeat_byte(1);
        assert!(batch.is_closed());

        let ctx = batch.processing_context();
        assert_eq!(ctx.batch_number, batch.number);
        assert_eq!(ctx.batch_l2_data, batch.batch_l2_data);
        assert_eq!(ctx.forced_batch_number, batch.forced_batch_number);
    }
}
