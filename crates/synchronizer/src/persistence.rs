//! The transactional boundary of the synchronizer: every remote batch is persisted inside a single
//! database transaction, committed only once the execution engine made its changes durable.

use crate::{flush::DurabilityGate, SyncError};

use alloy_primitives::Bytes;
use rollup_node_primitives::{
    Batch, ForkId, ProcessTransactionResponse, ProcessingContext, ProcessingReceipt,
};
use zkevm_db::{Database, DatabaseError, DatabaseOperations, DatabaseTransaction};

/// A store of the trusted state able to begin atomic transactions.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait StateStore: Send + Sync {
    /// The transaction type.
    type Transaction: StateTransaction;

    /// Begins a new transaction.
    async fn begin(&self) -> Result<Self::Transaction, DatabaseError>;
}

/// An atomic transaction over the trusted state.
#[async_trait::async_trait]
pub trait StateTransaction: Send + Sync + Sized {
    /// Returns the batch with the provided number, if any.
    async fn get_batch_by_number(&self, batch_number: u64) -> Result<Option<Batch>, DatabaseError>;

    /// Returns the fork governing the provided batch.
    async fn get_fork_id_by_batch_number(&self, batch_number: u64)
        -> Result<ForkId, DatabaseError>;

    /// Opens a new batch.
    async fn open_batch(&self, ctx: ProcessingContext) -> Result<(), DatabaseError>;

    /// Closes the last batch.
    async fn close_batch(&self, receipt: ProcessingReceipt) -> Result<(), DatabaseError>;

    /// Overwrites the raw transaction stream of a batch.
    async fn update_batch_l2_data(
        &self,
        batch_number: u64,
        batch_l2_data: Bytes,
    ) -> Result<(), DatabaseError>;

    /// Stores a processed transaction.
    async fn store_transaction(
        &self,
        batch_number: u64,
        l2_block_number: u64,
        position: usize,
        tx: &ProcessTransactionResponse,
    ) -> Result<(), DatabaseError>;

    /// Deletes every batch with a number greater than the provided one.
    async fn reset_trusted_state(&self, batch_number: u64) -> Result<u64, DatabaseError>;

    /// Commits the transaction.
    async fn commit(self) -> Result<(), DatabaseError>;

    /// Rolls the transaction back.
    async fn rollback(self) -> Result<(), DatabaseError>;
}

#[async_trait::async_trait]
impl StateStore for Database {
    type Transaction = DatabaseTransaction;

    async fn begin(&self) -> Result<Self::Transaction, DatabaseError> {
        self.tx().await
    }
}

#[async_trait::async_trait]
impl StateTransaction for DatabaseTransaction {
    async fn get_batch_by_number(&self, batch_number: u64) -> Result<Option<Batch>, DatabaseError> {
        DatabaseOperations::get_batch_by_number(self, batch_number).await
    }

    async fn get_fork_id_by_batch_number(
        &self,
        batch_number: u64,
    ) -> Result<ForkId, DatabaseError> {
        DatabaseOperations::get_fork_id_by_batch_number(self, batch_number).await
    }

    async fn open_batch(&self, ctx: ProcessingContext) -> Result<(), DatabaseError> {
        DatabaseOperations::open_batch(self, ctx).await
    }

    async fn close_batch(&self, receipt: ProcessingReceipt) -> Result<(), DatabaseError> {
        DatabaseOperations::close_batch(self, receipt).await
    }

    async fn update_batch_l2_data(
        &self,
        batch_number: u64,
        batch_l2_data: Bytes,
    ) -> Result<(), DatabaseError> {
        DatabaseOperations::update_batch_l2_data(self, batch_number, batch_l2_data).await
    }

    async fn store_transaction(
        &self,
        batch_number: u64,
        l2_block_number: u64,
        position: usize,
        tx: &ProcessTransactionResponse,
    ) -> Result<(), DatabaseError> {
        DatabaseOperations::store_transaction(self, batch_number, l2_block_number, position, tx)
            .await
    }

    async fn reset_trusted_state(&self, batch_number: u64) -> Result<u64, DatabaseError> {
        DatabaseOperations::reset_trusted_state(self, batch_number).await
    }

    async fn commit(self) -> Result<(), DatabaseError> {
        Self::commit(self).await
    }

    async fn rollback(self) -> Result<(), DatabaseError> {
        Self::rollback(self).await
    }
}

/// Wraps the processing of each remote batch in a single transaction of the [`StateStore`].
#[derive(Debug)]
pub struct PersistenceCoordinator<S> {
    store: S,
}

impl<S: StateStore> PersistenceCoordinator<S> {
    /// Returns a new [`PersistenceCoordinator`] over the provided store.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Begins the transaction of a batch.
    pub async fn begin(&self, batch_number: u64) -> Result<S::Transaction, SyncError> {
        self.store.begin().await.inspect_err(|err| {
            tracing::error!(target: "zkevm::synchronizer", batch_number, ?err, "failed to begin batch transaction");
        }).map_err(Into::into)
    }

    /// Finishes the transaction of a batch.
    ///
    /// On a processing error the transaction is rolled back. On success the durability gate is
    /// awaited before committing, and the transaction is rolled back if the gate fails.
    pub async fn finish<T>(
        &self,
        batch_number: u64,
        tx: S::Transaction,
        result: Result<T, SyncError>,
        gate: &dyn DurabilityGate,
    ) -> Result<T, SyncError> {
        let value = match result {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(target: "zkevm::synchronizer", batch_number, %err, "failed to process trusted batch");
                return Err(Self::rollback(batch_number, tx, err).await)
            }
        };

        tracing::debug!(target: "zkevm::synchronizer", batch_number, "checking flush id before commit");
        if let Err(err) = gate.check_flush_id().await {
            tracing::error!(target: "zkevm::synchronizer", batch_number, %err, "failed to check flush id");
            return Err(Self::rollback(batch_number, tx, err).await)
        }

        tx.commit().await.inspect_err(|err| {
            tracing::error!(target: "zkevm::synchronizer", batch_number, ?err, "failed to commit batch transaction");
        })?;
        Ok(value)
    }

    /// Rolls the transaction back after the provided error and returns the error to propagate: the
    /// cause if the rollback succeeded, a [`SyncError::Rollback`] otherwise.
    pub async fn rollback(batch_number: u64, tx: S::Transaction, cause: SyncError) -> SyncError {
        match tx.rollback().await {
            Ok(()) => cause,
            Err(rollback) => {
                tracing::error!(
                    target: "zkevm::synchronizer",
                    batch_number,
                    %rollback,
                    %cause,
                    "failed to roll back batch transaction"
                );
                SyncError::Rollback { rollback, cause: Box::new(cause) }
            }
        }
    }
}
