/// The error type for database operations.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// A database error occurred.
    #[error("database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),
    /// A batch was not found in the database.
    #[error("batch {0} not found in database")]
    BatchNotFound(u64),
    /// The batch is already closed.
    #[error("batch {0} is already closed")]
    BatchAlreadyClosed(u64),
    /// The batch cannot be opened on top of the current state.
    #[error("batch {number} cannot be opened: {reason}")]
    BatchNotOpenable {
        /// The batch number.
        number: u64,
        /// The reason the batch cannot be opened.
        reason: String,
    },
    /// The batch is not the latest batch and cannot be closed.
    #[error("batch {number} cannot be closed, the latest batch is {last:?}")]
    BatchNotClosable {
        /// The batch number.
        number: u64,
        /// The latest batch in the database.
        last: Option<u64>,
    },
    /// No fork covers the batch.
    #[error("no fork id found for batch {0}")]
    ForkIdNotFound(u64),
    /// A persisted column holds unexpected data.
    #[error("invalid data persisted in column {column} (len {len})")]
    InvalidData {
        /// The column name.
        column: &'static str,
        /// The length of the persisted value.
        len: usize,
    },
}
