//! Primitive types for the trusted state synchronizer of the rollup node.

pub use batch::{Batch, ProcessingContext, ProcessingReceipt};
mod batch;

pub use execution::{
    ExecutionMode, ProcessBatchResponse, ProcessBlockResponse, ProcessRequest,
    ProcessTransactionResponse, RomError,
};
mod execution;

pub use fork::{ForkId, ForkIdInterval};
mod fork;
