//! Whitelists of authorized service and proxy URNs/URIs.
//!
//! A whitelist is an optional JSON array of URN prefixes. Candidates are
//! matched case-insensitively against each prefix, so an entry authorizes its
//! whole subtree including query strings. An absent or empty list authorizes
//! every candidate; a list file that cannot be read or parsed is a fatal
//! configuration error rather than a silent fail-open.

use crate::errors::{CasError, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Prefix-based whitelist of authorized URNs.
#[derive(Debug, Clone, Default)]
pub struct UrnWhitelist {
    entries: Vec<String>,
}

impl UrnWhitelist {
    /// A whitelist that authorizes every candidate.
    pub fn permit_all() -> Self {
        Self::default()
    }

    /// Build a whitelist from explicit entries.
    pub fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    /// Load a whitelist from an optional JSON file.
    ///
    /// `None` yields a permit-all list. A path that cannot be opened, read or
    /// parsed as a JSON string array aborts construction.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::permit_all());
        };

        let raw = fs::read_to_string(path).map_err(|e| {
            CasError::config(format!(
                "cannot read URN list file \"{}\": {e}",
                path.display()
            ))
        })?;
        let entries: Vec<String> = serde_json::from_str(&raw).map_err(|e| {
            CasError::config(format!(
                "cannot parse URN list file \"{}\": {e}",
                path.display()
            ))
        })?;

        info!(file = %path.display(), entries = entries.len(), "loaded URN validation list");
        Ok(Self { entries })
    }

    /// Whether this list authorizes every candidate.
    pub fn is_open(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate a candidate against the list.
    ///
    /// Returns the candidate unchanged when it is authorized (any entry
    /// prefix-matches it, or the list is empty), `None` otherwise.
    pub fn valid<'a>(&self, candidate: &'a str) -> Option<&'a str> {
        if self.entries.is_empty() {
            return Some(candidate);
        }
        self.entries
            .iter()
            .any(|standard| Self::matches(standard, candidate))
            .then_some(candidate)
    }

    /// Case-insensitive prefix test: does `candidate` begin with `standard`?
    ///
    /// Prefix matching allows subtree URLs and query strings in the candidate.
    pub fn matches(standard: &str, candidate: &str) -> bool {
        candidate.to_lowercase().starts_with(&standard.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn match_is_case_insensitive_prefix() {
        assert!(UrnWhitelist::matches("urn:test", "URN:TEST:sub?x=1"));
        assert!(UrnWhitelist::matches("URN:Test", "urn:test:anything"));
        assert!(!UrnWhitelist::matches("urn:test", "urn:tes"));
        assert!(!UrnWhitelist::matches("urn:test", "xurn:test"));
    }

    #[test]
    fn empty_list_authorizes_everything() {
        let list = UrnWhitelist::permit_all();
        assert_eq!(list.valid("https://anything.example/"), Some("https://anything.example/"));
        assert!(list.is_open());
    }

    #[test]
    fn populated_list_filters_candidates() {
        let list = UrnWhitelist::new(vec!["https://svc.example/".into()]);
        assert_eq!(
            list.valid("https://svc.example/app?ticket=1"),
            Some("https://svc.example/app?ticket=1")
        );
        assert_eq!(list.valid("https://evil.example/"), None);
    }

    #[test]
    fn load_missing_path_is_permit_all() {
        let list = UrnWhitelist::load(None).expect("permit-all list");
        assert!(list.is_open());
    }

    #[test]
    fn load_valid_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"["urn:svc:one", "urn:svc:two"]"#).expect("write list");

        let list = UrnWhitelist::load(Some(file.path())).expect("loaded list");
        assert!(list.valid("urn:svc:one/sub").is_some());
        assert!(list.valid("urn:other").is_none());
    }

    #[test]
    fn load_unreadable_file_is_fatal() {
        let err = UrnWhitelist::load(Some(Path::new("/nonexistent/urns.json")))
            .expect_err("missing file must not fail open");
        assert!(matches!(err, CasError::Configuration { .. }));
    }

    #[test]
    fn load_malformed_file_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "not json at all").expect("write junk");

        let err = UrnWhitelist::load(Some(file.path())).expect_err("junk must not fail open");
        assert!(matches!(err, CasError::Configuration { .. }));
    }
}
