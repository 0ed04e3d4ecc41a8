//! TabSense Storage Layer
//!
//! SQLite-backed key/value persistence for the engine's durable state.
//! Only two keys are written today: `autoCleanEnabled` and `focusState`.

mod database;
mod error;
mod migrations;

pub use database::Database;
pub use error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Setting key holding the auto-clean toggle (JSON bool)
pub const AUTO_CLEAN_KEY: &str = "autoCleanEnabled";

/// Setting key holding the persisted focus session (JSON object)
pub const FOCUS_STATE_KEY: &str = "focusState";
