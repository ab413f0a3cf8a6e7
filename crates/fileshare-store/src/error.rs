//! Store errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Insert collided with an existing primary key.
    #[error("duplicate record: {0}")]
    Duplicate(String),

    /// A stored row could not be decoded into a record.
    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("migration error: {0}")]
    Migration(String),

    /// A thread panicked while holding the in-memory store lock.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// The `spawn_blocking` task running a database call failed to join.
    #[error("blocking task failed: {0}")]
    BlockingTask(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
