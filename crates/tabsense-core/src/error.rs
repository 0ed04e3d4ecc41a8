//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] tabsense_storage::StorageError),

    #[error("Tab error: {0}")]
    Tab(#[from] tabsense_tabs::TabError),

    #[error("Focus error: {0}")]
    Focus(#[from] tabsense_focus::FocusError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Engine is not running")]
    EngineStopped,
}
