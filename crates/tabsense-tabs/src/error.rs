//! Tab error types

use thiserror::Error;

use crate::tab::TabId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TabError {
    #[error("Tab not found: {0}")]
    NotFound(TabId),

    /// The host refused or failed a request (tab closed mid-flight, etc.)
    #[error("Host request failed: {0}")]
    Host(String),
}
