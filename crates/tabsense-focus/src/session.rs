//! Focus session data structure

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::allowlist::Allowlist;

/// Persisted as the `focusState` setting:
/// `{"active": bool, "endAt": epoch-millis | null, "allowlist": [..]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusSession {
    pub active: bool,
    /// Meaningful only while `active`
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub end_at: Option<DateTime<Utc>>,
    /// Normalized hostname fragments
    #[serde(default)]
    pub allowlist: Vec<String>,
}

impl FocusSession {
    pub fn idle() -> Self {
        Self::default()
    }

    /// The end time is kept at millisecond precision, matching what is stored.
    /// `None` when `now + duration` is not a representable time.
    pub fn started(now: DateTime<Utc>, duration: Duration, allowlist: Allowlist) -> Option<Self> {
        let end_at = now.checked_add_signed(duration)?.trunc_subsecs(3);
        Some(Self {
            active: true,
            end_at: Some(end_at),
            allowlist: allowlist.into_entries(),
        })
    }

    /// Active, but the end time has already passed
    pub fn is_elapsed(&self, now: DateTime<Utc>) -> bool {
        match (self.active, self.end_at) {
            (true, Some(end_at)) => end_at <= now,
            // An active session without an end time can never expire on its own
            (true, None) => true,
            (false, _) => false,
        }
    }

    /// Time left for countdown display; `None` when idle
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        if !self.active {
            return None;
        }
        self.end_at
            .map(|end_at| (end_at - now).max(Duration::zero()))
    }
}
