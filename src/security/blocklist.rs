//! Host deny-list.
//!
//! A host is blocked when it equals an entry, or when it ends with
//! `"." + entry` (a subdomain of a blocked domain). Matching is
//! case-sensitive and performs no normalization. The set is read-only
//! after load, so lookups need no synchronization.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlocklistError {
    #[error("could not read blocklist {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Loaded set of blocked domains.
#[derive(Debug, Clone, Default)]
pub struct Blocklist {
    entries: HashSet<String>,
}

impl Blocklist {
    /// Build a blocklist from in-memory entries. Duplicates collapse.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(Into::into)
                .filter(|entry: &String| !entry.is_empty())
                .collect(),
        }
    }

    /// Load one entry per line. Blank lines and `#` comments are skipped.
    pub fn load(path: &Path) -> Result<Self, BlocklistError> {
        let io_err = |source| BlocklistError::Io {
            path: path.to_path_buf(),
            source,
        };

        let reader = BufReader::new(File::open(path).map_err(io_err)?);
        let mut entries = HashSet::new();
        for line in reader.lines() {
            let line = line.map_err(io_err)?;
            let entry = line.trim();
            if entry.is_empty() || entry.starts_with('#') {
                continue;
            }
            entries.insert(entry.to_string());
        }

        tracing::info!(path = ?path, entries = entries.len(), "Blocklist loaded");
        Ok(Self { entries })
    }

    /// Whether `host` matches an entry exactly or as a dot-bounded suffix.
    pub fn is_blocked(&self, host: &str) -> bool {
        if self.entries.contains(host) {
            return true;
        }
        // Each dot after the first byte starts a candidate parent domain.
        host.match_indices('.')
            .filter(|(idx, _)| *idx > 0)
            .any(|(idx, _)| self.entries.contains(&host[idx + 1..]))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_subdomain_matches() {
        let list = Blocklist::from_entries(["ads.example.com"]);
        assert!(list.is_blocked("ads.example.com"));
        assert!(list.is_blocked("x.ads.example.com"));
        assert!(list.is_blocked("a.b.ads.example.com"));
        assert!(!list.is_blocked("notads.example.com"));
        assert!(!list.is_blocked("example.com"));
    }

    #[test]
    fn suffix_requires_a_label_before_the_dot() {
        let list = Blocklist::from_entries(["example.com"]);
        assert!(!list.is_blocked(".example.com"));
        assert!(list.is_blocked("www.example.com"));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let list = Blocklist::from_entries(["example.com"]);
        assert!(!list.is_blocked("WWW.EXAMPLE.COM"));
        assert!(!list.is_blocked("Example.com"));
    }

    #[test]
    fn duplicate_entries_are_a_no_op() {
        let single = Blocklist::from_entries(["tracker.net"]);
        let doubled = Blocklist::from_entries(["tracker.net", "tracker.net"]);
        assert_eq!(doubled.len(), 1);
        for host in ["tracker.net", "a.tracker.net", "tracker.network", "net"] {
            assert_eq!(single.is_blocked(host), doubled.is_blocked(host), "{host}");
        }
    }

    #[test]
    fn empty_list_blocks_nothing() {
        let list = Blocklist::default();
        assert!(list.is_empty());
        assert!(!list.is_blocked("anything.com"));
        assert!(!list.is_blocked(""));
    }

    #[test]
    fn load_skips_comments_and_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocked.txt");
        std::fs::write(&path, "# ads\nads.example.com\n\n  tracker.net \r\nads.example.com\n").unwrap();

        let list = Blocklist::load(&path).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.is_blocked("tracker.net"));
        assert!(list.is_blocked("cdn.ads.example.com"));
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Blocklist::load(&dir.path().join("missing.txt")).is_err());
    }
}
