//! Allowlist enforcement
//!
//! Decides, for one tab URL, whether an active focus session should send
//! the tab to the block page. The decision is pure; the caller performs the
//! redirect.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::allowlist::matches_host;

/// Page shown in place of a blocked site
pub const DEFAULT_BLOCK_PAGE: &str = "chrome-extension://tabsense/blocked.html";

/// URL scheme prefixes that are never blocked
pub const DEFAULT_INTERNAL_SCHEMES: &[&str] = &["chrome:", "chrome-extension:", "about:"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Internal page, never enforced
    Exempt,
    /// Host matches an allowlist entry
    Allowed,
    /// Already showing the block page
    AlreadyBlocked,
    /// Redirect to the block page
    Block,
    /// No URL or no parseable host; left alone
    Unresolvable,
}

impl Verdict {
    pub fn should_redirect(&self) -> bool {
        matches!(self, Verdict::Block)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enforcer {
    block_page: String,
    internal_schemes: Vec<String>,
}

impl Enforcer {
    pub fn new(block_page: impl Into<String>, internal_schemes: Vec<String>) -> Self {
        Self {
            block_page: block_page.into(),
            internal_schemes: internal_schemes
                .into_iter()
                .map(|s| s.to_lowercase())
                .collect(),
        }
    }

    pub fn block_page(&self) -> &str {
        &self.block_page
    }

    pub fn evaluate(&self, url: Option<&str>, allowlist: &[String]) -> Verdict {
        let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
            return Verdict::Unresolvable;
        };

        if url.starts_with(self.block_page.as_str()) {
            return Verdict::AlreadyBlocked;
        }

        let lowered = url.to_lowercase();
        if self
            .internal_schemes
            .iter()
            .any(|scheme| lowered.starts_with(scheme.as_str()))
        {
            return Verdict::Exempt;
        }

        let host = match Url::parse(url) {
            Ok(parsed) => match parsed.host_str() {
                Some(host) if !host.is_empty() => host.to_lowercase(),
                _ => return Verdict::Unresolvable,
            },
            Err(_) => return Verdict::Unresolvable,
        };

        if matches_host(allowlist, &host) {
            Verdict::Allowed
        } else {
            Verdict::Block
        }
    }
}

impl Default for Enforcer {
    fn default() -> Self {
        Self::new(
            DEFAULT_BLOCK_PAGE,
            DEFAULT_INTERNAL_SCHEMES.iter().map(|s| s.to_string()).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_allowlisted_subdomain() {
        let enforcer = Enforcer::default();
        let list = allow(&["github.com"]);

        assert_eq!(
            enforcer.evaluate(Some("https://sub.github.com/x"), &list),
            Verdict::Allowed
        );
        assert_eq!(
            enforcer.evaluate(Some("https://evil.example.com"), &list),
            Verdict::Block
        );
    }

    #[test]
    fn test_internal_pages_are_exempt() {
        let enforcer = Enforcer::default();
        let list = allow(&[]);

        assert_eq!(
            enforcer.evaluate(Some("chrome://extensions"), &list),
            Verdict::Exempt
        );
        assert_eq!(
            enforcer.evaluate(Some("chrome-extension://other/page.html"), &list),
            Verdict::Exempt
        );
        assert_eq!(enforcer.evaluate(Some("about:blank"), &list), Verdict::Exempt);
        assert_eq!(enforcer.evaluate(Some("About:Blank"), &list), Verdict::Exempt);
    }

    #[test]
    fn test_block_page_is_idempotent() {
        let enforcer = Enforcer::default();
        let verdict = enforcer.evaluate(Some(DEFAULT_BLOCK_PAGE), &allow(&[]));
        assert_eq!(verdict, Verdict::AlreadyBlocked);
        assert!(!verdict.should_redirect());
    }

    #[test]
    fn test_custom_block_page() {
        let enforcer = Enforcer::new("https://focus.local/blocked", Vec::new());
        assert_eq!(
            enforcer.evaluate(Some("https://focus.local/blocked?from=x"), &allow(&[])),
            Verdict::AlreadyBlocked
        );
        // No internal schemes configured
        assert_eq!(enforcer.evaluate(Some("about:blank"), &allow(&[])), Verdict::Unresolvable);
    }

    #[test]
    fn test_malformed_urls_are_unresolvable() {
        let enforcer = Enforcer::default();
        let list = allow(&["github.com"]);

        assert_eq!(enforcer.evaluate(None, &list), Verdict::Unresolvable);
        assert_eq!(enforcer.evaluate(Some(""), &list), Verdict::Unresolvable);
        assert_eq!(enforcer.evaluate(Some("::nonsense"), &list), Verdict::Unresolvable);
        assert_eq!(
            enforcer.evaluate(Some("data:text/plain,hi"), &list),
            Verdict::Unresolvable
        );
    }
}
