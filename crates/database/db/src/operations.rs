use super::{models, DatabaseError};
use crate::DatabaseConnectionProvider;

use alloy_primitives::Bytes;
use rollup_node_primitives::{
    Batch, ForkId, ForkIdInterval, ProcessTransactionResponse, ProcessingContext,
    ProcessingReceipt,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

/// The [`DatabaseOperations`] trait provides methods for interacting with the trusted state.
#[async_trait::async_trait]
pub trait DatabaseOperations: DatabaseConnectionProvider + Sync {
    /// Get a [`Batch`] from the database by its number.
    async fn get_batch_by_number(&self, batch_number: u64) -> Result<Option<Batch>, DatabaseError> {
        models::batch::Entity::find_by_id(batch_number as i64)
            .one(self.get_connection())
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    /// Get the number of the latest batch in the database.
    async fn get_last_batch_number(&self) -> Result<Option<u64>, DatabaseError> {
        Ok(models::batch::Entity::find()
            .order_by_desc(models::batch::Column::BatchNumber)
            .select_only()
            .column(models::batch::Column::BatchNumber)
            .into_tuple::<i64>()
            .one(self.get_connection())
            .await?
            .map(|n| n as u64))
    }

    /// Get the latest [`Batch`] in the database.
    async fn get_last_batch(&self) -> Result<Option<Batch>, DatabaseError> {
        models::batch::Entity::find()
            .order_by_desc(models::batch::Column::BatchNumber)
            .one(self.get_connection())
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    /// Opens a new batch from the provided [`ProcessingContext`].
    ///
    /// The batch must directly follow the latest batch, which must be closed, and its timestamp
    /// cannot be earlier than the latest batch's timestamp.
    async fn open_batch(&self, ctx: ProcessingContext) -> Result<(), DatabaseError> {
        let number = ctx.batch_number;
        if let Some(last) = self.get_last_batch().await? {
            let reason = if last.number + 1 != number {
                Some(format!("expected batch {}", last.number + 1))
            } else if last.is_open() {
                Some(format!("previous batch {} is still open", last.number))
            } else if ctx.timestamp < last.timestamp {
                Some(format!(
                    "timestamp {} is earlier than previous batch timestamp {}",
                    ctx.timestamp, last.timestamp
                ))
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(DatabaseError::BatchNotOpenable { number, reason })
            }
        }

        tracing::trace!(target: "zkevm::db", batch_number = number, "Opening batch in database.");
        let batch: models::batch::ActiveModel = ctx.into();
        batch.insert(self.get_connection()).await?;
        Ok(())
    }

    /// Closes the batch from the provided [`ProcessingReceipt`], setting its final roots and raw
    /// data.
    ///
    /// Returns [`DatabaseError::BatchAlreadyClosed`] if the batch is already closed, whether or not
    /// it is the latest batch.
    async fn close_batch(&self, receipt: ProcessingReceipt) -> Result<(), DatabaseError> {
        let number = receipt.batch_number;
        let model = models::batch::Entity::find_by_id(number as i64)
            .one(self.get_connection())
            .await?
            .ok_or(DatabaseError::BatchNotFound(number))?;
        let batch: Batch = model.clone().try_into()?;
        if batch.is_closed() {
            return Err(DatabaseError::BatchAlreadyClosed(number))
        }

        let last = self.get_last_batch_number().await?;
        if last != Some(number) {
            return Err(DatabaseError::BatchNotClosable { number, last })
        }

        tracing::trace!(target: "zkevm::db", batch_number = number, state_root = ?receipt.state_root, "Closing batch in database.");
        let mut batch: models::batch::ActiveModel = model.into();
        batch.state_root = Set(receipt.state_root.to_vec());
        batch.local_exit_root = Set(receipt.local_exit_root.to_vec());
        batch.acc_input_hash = Set(receipt.acc_input_hash.to_vec());
        batch.batch_l2_data = Set(receipt.batch_l2_data.to_vec());
        batch.update(self.get_connection()).await?;
        Ok(())
    }

    /// Overwrites the raw transaction stream of a batch.
    async fn update_batch_l2_data(
        &self,
        batch_number: u64,
        batch_l2_data: Bytes,
    ) -> Result<(), DatabaseError> {
        let model = models::batch::Entity::find_by_id(batch_number as i64)
            .one(self.get_connection())
            .await?
            .ok_or(DatabaseError::BatchNotFound(batch_number))?;

        tracing::trace!(target: "zkevm::db", batch_number, len = batch_l2_data.len(), "Updating batch l2 data in database.");
        let mut batch: models::batch::ActiveModel = model.into();
        batch.batch_l2_data = Set(batch_l2_data.to_vec());
        batch.update(self.get_connection()).await?;
        Ok(())
    }

    /// Stores a processed transaction of a batch.
    async fn store_transaction(
        &self,
        batch_number: u64,
        l2_block_number: u64,
        position: usize,
        tx: &ProcessTransactionResponse,
    ) -> Result<(), DatabaseError> {
        tracing::trace!(target: "zkevm::db", batch_number, l2_block_number, tx_hash = ?tx.tx_hash, "Storing transaction in database.");
        let model =
            models::batch_transaction::ActiveModel::new(batch_number, l2_block_number, position, tx);
        model.insert(self.get_connection()).await?;
        Ok(())
    }

    /// Get the stored transactions of a batch, in execution order.
    async fn get_batch_transactions(
        &self,
        batch_number: u64,
    ) -> Result<Vec<ProcessTransactionResponse>, DatabaseError> {
        models::batch_transaction::Entity::find()
            .filter(models::batch_transaction::Column::BatchNumber.eq(batch_number as i64))
            .order_by_asc(models::batch_transaction::Column::L2BlockNumber)
            .order_by_asc(models::batch_transaction::Column::Position)
            .all(self.get_connection())
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    /// Deletes every batch, and its transactions, with a number greater than the provided batch
    /// number.
    async fn reset_trusted_state(&self, batch_number: u64) -> Result<u64, DatabaseError> {
        tracing::trace!(target: "zkevm::db", batch_number, "Deleting batches greater than batch number.");
        models::batch_transaction::Entity::delete_many()
            .filter(models::batch_transaction::Column::BatchNumber.gt(batch_number as i64))
            .exec(self.get_connection())
            .await?;
        Ok(models::batch::Entity::delete_many()
            .filter(models::batch::Column::BatchNumber.gt(batch_number as i64))
            .exec(self.get_connection())
            .await?
            .rows_affected)
    }

    /// Inserts a [`ForkIdInterval`] into the database.
    async fn insert_fork_id(&self, interval: ForkIdInterval) -> Result<(), DatabaseError> {
        tracing::trace!(target: "zkevm::db", fork_id = %interval.fork_id, from = interval.from_batch_number, "Inserting fork id into database.");
        let interval: models::fork_id::ActiveModel = interval.into();
        interval.insert(self.get_connection()).await?;
        Ok(())
    }

    /// Returns the [`ForkId`] governing the provided batch: the fork with the greatest starting
    /// batch not after it.
    async fn get_fork_id_by_batch_number(&self, batch_number: u64) -> Result<ForkId, DatabaseError> {
        let from = batch_number.min(i64::MAX as u64) as i64;
        models::fork_id::Entity::find()
            .filter(models::fork_id::Column::FromBatchNumber.lte(from))
            .order_by_desc(models::fork_id::Column::FromBatchNumber)
            .one(self.get_connection())
            .await?
            .map(|model| ForkIdInterval::from(model).fork_id)
            .ok_or(DatabaseError::ForkIdNotFound(batch_number))
    }
}

impl<T> DatabaseOperations for T where T: DatabaseConnectionProvider + Sync {}
