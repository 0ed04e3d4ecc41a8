//! Focus Manager
//!
//! Owns the single focus session and its persistence.
//! Every mutation is written to the `focusState` setting.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

use tabsense_storage::{Database, FOCUS_STATE_KEY};

use crate::allowlist::Allowlist;
use crate::error::FocusError;
use crate::session::FocusSession;
use crate::Result;

/// Outcome of loading the persisted session at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restored {
    /// Nothing stored, or stored idle
    Idle,
    /// Still running; the caller re-arms the expiry timer
    Resumed { end_at: DateTime<Utc> },
    /// Stored session had already ended and was reset to idle
    Expired,
}

pub struct FocusManager {
    state: Arc<RwLock<FocusSession>>,
    db: Database,
}

impl FocusManager {
    pub fn new(db: Database) -> Self {
        Self {
            state: Arc::new(RwLock::new(FocusSession::idle())),
            db,
        }
    }

    /// Load the persisted session, reconciling one that ended while the
    /// process was down. Unreadable state is treated as idle.
    pub fn restore(&self, now: DateTime<Utc>) -> Result<Restored> {
        let stored = match self.db.get_json::<FocusSession>(FOCUS_STATE_KEY) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable focus state");
                None
            }
        };

        let Some(session) = stored else {
            *self.state.write() = FocusSession::idle();
            return Ok(Restored::Idle);
        };

        if !session.active {
            *self.state.write() = FocusSession::idle();
            return Ok(Restored::Idle);
        }

        if session.is_elapsed(now) {
            tracing::info!(end_at = ?session.end_at, "Focus session ended while offline");
            let idle = FocusSession::idle();
            *self.state.write() = idle.clone();
            self.save(&idle)?;
            return Ok(Restored::Expired);
        }

        let end_at = session.end_at.unwrap_or(now);
        tracing::info!(
            end_at = %end_at,
            allowlist = ?session.allowlist,
            "Resumed focus session"
        );
        *self.state.write() = session;

        Ok(Restored::Resumed { end_at })
    }

    /// Start (or replace) the session. Nothing changes if the duration is
    /// out of range or persisting fails.
    pub fn start(
        &self,
        now: DateTime<Utc>,
        duration: Duration,
        allowlist: Allowlist,
    ) -> Result<FocusSession> {
        if duration <= Duration::zero() {
            return Err(FocusError::InvalidDuration(duration.num_minutes()));
        }
        let session = FocusSession::started(now, duration, allowlist)
            .ok_or(FocusError::InvalidDuration(duration.num_minutes()))?;
        self.save(&session)?;
        *self.state.write() = session.clone();

        tracing::info!(
            end_at = ?session.end_at,
            allowlist = ?session.allowlist,
            "Started focus session"
        );

        Ok(session)
    }

    /// End the session. The in-memory state is reset even if persisting
    /// fails, so enforcement stops immediately.
    pub fn stop(&self) -> Result<FocusSession> {
        let idle = FocusSession::idle();
        let previous = std::mem::replace(&mut *self.state.write(), idle.clone());

        if previous.active {
            tracing::info!("Stopped focus session");
        }

        self.save(&idle)?;
        Ok(idle)
    }

    /// Current session snapshot
    pub fn status(&self) -> FocusSession {
        self.state.read().clone()
    }

    pub fn is_active(&self) -> bool {
        self.state.read().active
    }

    fn save(&self, session: &FocusSession) -> Result<()> {
        Ok(self.db.set_json(FOCUS_STATE_KEY, session)?)
    }
}

impl Clone for FocusManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            db: self.db.clone(),
        }
    }
}
