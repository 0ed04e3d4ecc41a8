//! TabSense Focus Sessions
//!
//! A focus session is a timed window during which navigation is limited to
//! an allowlist of hostname fragments:
//! - At most one session exists, active or idle
//! - Sessions persist on every mutation and survive a restart
//! - A session restored after its end time is reconciled to idle silently
//! - Internal pages (browser, extension, `about:`) are never blocked

mod allowlist;
mod enforcement;
mod error;
mod manager;
mod session;

pub use allowlist::{normalize_entry, Allowlist};
pub use enforcement::{Enforcer, Verdict, DEFAULT_BLOCK_PAGE, DEFAULT_INTERNAL_SCHEMES};
pub use error::FocusError;
pub use manager::{FocusManager, Restored};
pub use session::FocusSession;

pub type Result<T> = std::result::Result<T, FocusError>;
