//! Focus error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FocusError {
    #[error("Focus duration must be positive and representable, got {0} minutes")]
    InvalidDuration(i64),

    #[error("Storage error: {0}")]
    Storage(#[from] tabsense_storage::StorageError),
}
