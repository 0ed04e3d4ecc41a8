//! Allowlist parsing
//!
//! Users type entries like `https://github.com/` or `Docs.rs`. Entries are
//! normalized once, when a session starts, into bare lowercase hostname
//! fragments; enforcement then matches by substring containment.

use serde::{Deserialize, Serialize};

/// Normalized allowlist entries, in the order given
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Allowlist(Vec<String>);

impl Allowlist {
    /// Normalize free-form entries, dropping the ones that end up empty.
    /// Duplicates are kept; they are redundant but harmless.
    pub fn parse<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            entries
                .into_iter()
                .filter_map(|entry| normalize_entry(entry.as_ref()))
                .collect(),
        )
    }

    /// Any entry contained in `host`
    pub fn allows(&self, host: &str) -> bool {
        matches_host(&self.0, host)
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    pub fn into_entries(self) -> Vec<String> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Strip a scheme prefix and trailing path separators, lowercase.
pub fn normalize_entry(entry: &str) -> Option<String> {
    let entry = entry.trim();
    let without_scheme = match entry.find("://") {
        Some(index) => &entry[index + 3..],
        None => entry,
    };

    let normalized = without_scheme.trim_end_matches('/').trim().to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

pub(crate) fn matches_host(entries: &[String], host: &str) -> bool {
    entries.iter().any(|entry| host.contains(entry.as_str()))
}
