/*============================================================
  Synavera Project: Syn-Upd
  Module: synupd_core::blacklist
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Load the ignore list and decide whether a logical update
    has been blacklisted by the operator.

  Security / Safety Notes:
    Reads the system blacklist file read-only; a missing file
    simply means nothing is ignored.

  Dependencies:
    glob for shell-style source name patterns.

  Operational Scope:
    Consulted by the `check` and `list` subcommands.

  Revision History:
    2025-11-12 COD  Authored blacklist matching.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit pattern=version semantics
    - Malformed patterns reported, never fatal
============================================================*/

use std::path::Path;

use glob::Pattern;

use crate::error::{Result, SynupdError};
use crate::logger::Logger;

/// One `pattern` or `pattern=version` ignore entry.
#[derive(Debug, Clone)]
pub struct BlacklistEntry {
    pattern: Pattern,
    version: Option<String>,
}

impl BlacklistEntry {
    pub fn parse(entry: &str) -> Result<Self> {
        let (name, version) = match entry.split_once('=') {
            Some((name, version)) => (name, Some(version.to_string())),
            None => (entry, None),
        };
        let pattern = Pattern::new(name.trim()).map_err(|err| {
            SynupdError::Config(format!("Invalid blacklist pattern `{name}`: {err}"))
        })?;
        Ok(Self { pattern, version })
    }

    pub fn matches(&self, source_name: &str, version: &str) -> bool {
        self.pattern.matches(source_name)
            && self.version.as_deref().map_or(true, |wanted| wanted == version)
    }
}

/// Ignore list combined from the blacklist file and the command line.
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    entries: Vec<BlacklistEntry>,
}

impl Blacklist {
    /// Read `path` (if present) and append comma-separated `extra` entries.
    pub fn load(path: Option<&Path>, extra: Option<&str>, logger: &Logger) -> Result<Self> {
        let mut raw: Vec<String> = Vec::new();

        if let Some(path) = path.filter(|path| path.is_file()) {
            let contents = std::fs::read_to_string(path).map_err(|err| {
                SynupdError::Filesystem(format!(
                    "Failed to read blacklist {}: {err}",
                    path.display()
                ))
            })?;
            raw.extend(
                contents
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !line.starts_with('#'))
                    .map(str::to_string),
            );
        }
        if let Some(extra) = extra {
            raw.extend(
                extra
                    .split(',')
                    .map(str::trim)
                    .filter(|entry| !entry.is_empty())
                    .map(str::to_string),
            );
        }

        let mut entries = Vec::with_capacity(raw.len());
        for entry in raw {
            match BlacklistEntry::parse(&entry) {
                Ok(parsed) => entries.push(parsed),
                Err(err) => logger.warn("BLACKLIST", err.to_string()),
            }
        }
        Ok(Self { entries })
    }

    pub fn from_entries(entries: Vec<BlacklistEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_blacklisted(&self, source_name: &str, version: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.matches(source_name, version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_glob_and_version_entries() {
        let list = Blacklist::from_entries(vec![
            BlacklistEntry::parse("linux-*").unwrap(),
            BlacklistEntry::parse("firefox=120.0").unwrap(),
        ]);
        assert!(list.is_blacklisted("linux-meta", "6.8.0"));
        assert!(list.is_blacklisted("firefox", "120.0"));
        assert!(!list.is_blacklisted("firefox", "121.0"));
        assert!(!list.is_blacklisted("thunderbird", "120.0"));
    }

    #[test]
    fn test_load_merges_file_and_ignore_argument() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# held back\n\nvlc\n  gimp=2.10.36  ").unwrap();

        let logger = Logger::stderr_only(false);
        let list = Blacklist::load(Some(file.path()), Some("cups*, ,[bad"), &logger).unwrap();
        assert_eq!(list.len(), 3);
        assert!(list.is_blacklisted("vlc", "3.0"));
        assert!(list.is_blacklisted("gimp", "2.10.36"));
        assert!(list.is_blacklisted("cups-filters", "1.0"));
        assert!(!list.is_blacklisted("gimp", "2.10.38"));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let logger = Logger::stderr_only(false);
        let list = Blacklist::load(Some(Path::new("/nonexistent/blacklist")), None, &logger).unwrap();
        assert_eq!(list.len(), 0);
    }
}
