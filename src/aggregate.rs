/*============================================================
  Synavera Project: Syn-Upd
  Module: synupd_core::aggregate
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Fold the scanner's raw binary-package records into one
    logical update per source and select what to present.

  Security / Safety Notes:
    Pure in-memory pass; a malformed record is skipped and
    logged so it never hides the remaining updates.

  Dependencies:
    None beyond crate modules.

  Operational Scope:
    Backs the `check`, `list` and `track` subcommands.

  Revision History:
    2025-11-12 COD  Authored native aggregation pass.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic ordering for reproducible output
    - Skips over failures, never aborts the pass
============================================================*/

use std::collections::BTreeMap;

use crate::alias::AliasTable;
use crate::blacklist::Blacklist;
use crate::logger::Logger;
use crate::package_info::RawPackageRecord;
use crate::update::{LogicalUpdate, UpdateType};

/// Logical updates keyed by (possibly aliased) source name.
#[derive(Debug, Default)]
pub struct UpdateSet {
    updates: BTreeMap<String, LogicalUpdate>,
}

impl UpdateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the whole aggregation pass over `records`.
    pub fn from_records(records: &[RawPackageRecord], aliases: &AliasTable, logger: &Logger) -> Self {
        let mut set = Self::new();
        for record in records {
            set.add_record(record, aliases, logger);
        }
        logger.debug(
            "AGGREGATE",
            format!(
                "{} package records folded into {} updates",
                records.len(),
                set.len()
            ),
        );
        set
    }

    /// Fold one record into the set. Returns `false` when it was skipped.
    pub fn add_record(&mut self, record: &RawPackageRecord, aliases: &AliasTable, logger: &Logger) -> bool {
        if record.name.is_empty() || record.source_name.is_empty() {
            logger.warn(
                "SKIP",
                format!("Package record `{}` lacks a name or source name", record.name),
            );
            return false;
        }
        if record.is_current() {
            logger.debug("SKIP", format!("{} is already at {}", record.name, record.candidate_version));
            return false;
        }

        let alias = aliases.get(&record.source_name).map(|alias| alias.normalized());
        let source_name = alias
            .as_ref()
            .and_then(|alias| alias.name.clone())
            .unwrap_or_else(|| record.source_name.clone());

        if let Some(update) = self.updates.get_mut(&source_name) {
            update.add_package(record);
            return true;
        }

        let mut update = LogicalUpdate::from_package(record, alias.as_ref().and_then(|a| a.name.as_deref()));
        if let Some(alias) = &alias {
            if let Some(short) = &alias.short_description {
                update.short_description = short.clone();
            }
            if let Some(description) = &alias.description {
                update.description = description.clone();
            }
        }
        logger.debug(
            "AGGREGATE",
            format!("{} → {} ({})", record.name, update.source_name, update.update_type),
        );
        self.updates.insert(source_name, update);
        true
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn get(&self, source_name: &str) -> Option<&LogicalUpdate> {
        self.updates.get(source_name)
    }

    /// Updates in source-name order.
    pub fn iter(&self) -> impl Iterator<Item = &LogicalUpdate> {
        self.updates.values()
    }

    /// Updates surviving `filter`, in source-name order.
    pub fn select<'a>(&'a self, filter: &'a UpdateFilter) -> Vec<&'a LogicalUpdate> {
        self.iter().filter(|update| filter.accepts(update)).collect()
    }
}

/// Restricts which logical updates are presented.
#[derive(Debug, Clone, Default)]
pub struct UpdateFilter {
    pub only_kernel: bool,
    pub only_security: bool,
    pub blacklist: Blacklist,
    pub priority_updates: Vec<String>,
}

impl UpdateFilter {
    pub fn accepts(&self, update: &LogicalUpdate) -> bool {
        if self.priority_updates.iter().any(|name| *name == update.source_name) {
            return true;
        }
        if self.only_kernel && update.update_type != UpdateType::Kernel {
            return false;
        }
        if self.only_security && update.update_type != UpdateType::Security {
            return false;
        }
        !self
            .blacklist
            .is_blacklisted(&update.real_source_name, &update.new_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::Alias;
    use crate::blacklist::BlacklistEntry;
    use crate::package_info::PackageOrigin;

    fn record(name: &str, source: &str, size: u64) -> RawPackageRecord {
        RawPackageRecord {
            name: name.to_string(),
            candidate_version: "1.1".to_string(),
            installed_version: Some("1.0".to_string()),
            size,
            source_name: source.to_string(),
            source_version: "1.1".to_string(),
            section: "misc".to_string(),
            origins: vec![PackageOrigin {
                origin: "Ubuntu".to_string(),
                archive: "jammy-updates".to_string(),
                ..PackageOrigin::default()
            }],
            short_description: String::new(),
            description: String::new(),
        }
    }

    #[test]
    fn test_groups_by_source_and_sums_sizes() {
        let logger = Logger::stderr_only(false);
        let records = vec![
            record("libgtk-3-0", "gtk+3.0", 10),
            record("gtk-update-icon-cache", "gtk+3.0", 20),
            record("libgtk-3-common", "gtk+3.0", 30),
            record("htop", "htop", 5),
        ];
        let set = UpdateSet::from_records(&records, &AliasTable::new(), &logger);
        assert_eq!(set.len(), 2);
        let gtk = set.get("gtk+3.0").unwrap();
        assert_eq!(gtk.size, 60);
        assert_eq!(gtk.package_names.len(), 3);
        assert_eq!(gtk.main_package_name, "gtk-update-icon-cache");
        let names: Vec<&str> = set.iter().map(|u| u.source_name.as_str()).collect();
        assert_eq!(names, ["gtk+3.0", "htop"]);
    }

    #[test]
    fn test_current_and_nameless_records_are_skipped() {
        let logger = Logger::stderr_only(false);
        let mut current = record("bash", "bash", 1);
        current.installed_version = Some("1.1".to_string());
        let nameless = record("", "mystery", 1);
        let fresh = {
            let mut r = record("newpkg", "newpkg", 3);
            r.installed_version = None;
            r
        };
        let set = UpdateSet::from_records(&[current, nameless, fresh], &AliasTable::new(), &logger);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("newpkg").unwrap().old_version, "");
    }

    #[test]
    fn test_alias_renames_and_overrides_descriptions() {
        let logger = Logger::stderr_only(false);
        let mut aliases = AliasTable::new();
        aliases.insert(
            "firefox-esr".to_string(),
            Alias::new(Some("_(\"firefox\")"), Some("Web browser"), None),
        );
        let set = UpdateSet::from_records(
            &[record("firefox-esr", "firefox-esr", 9), record("firefox-esr-l10n-de", "firefox-esr", 1)],
            &aliases,
            &logger,
        );
        let update = set.get("firefox").unwrap();
        assert_eq!(update.real_source_name, "firefox-esr");
        assert_eq!(update.display_name, "firefox");
        assert_eq!(update.short_description, "Web browser");
        assert_eq!(update.update_type, UpdateType::Security);
        assert_eq!(update.size, 10);
    }

    #[test]
    fn test_filter_honours_types_blacklist_and_priority() {
        let logger = Logger::stderr_only(false);
        let mut kernel = record("linux-image-generic", "linux-meta", 1);
        kernel.section = "kernel".to_string();
        let set = UpdateSet::from_records(
            &[kernel, record("vlc", "vlc", 1), record("mintupdate", "mintupdate", 1)],
            &AliasTable::new(),
            &logger,
        );

        let filter = UpdateFilter {
            blacklist: Blacklist::from_entries(vec![
                BlacklistEntry::parse("vlc").unwrap(),
                BlacklistEntry::parse("mint*").unwrap(),
            ]),
            priority_updates: vec!["mintupdate".to_string()],
            ..UpdateFilter::default()
        };
        let names: Vec<&str> = set.select(&filter).iter().map(|u| u.source_name.as_str()).collect();
        assert_eq!(names, ["linux-meta", "mintupdate"]);

        let kernels = UpdateFilter {
            only_kernel: true,
            ..UpdateFilter::default()
        };
        let names: Vec<&str> = set.select(&kernels).iter().map(|u| u.source_name.as_str()).collect();
        assert_eq!(names, ["linux-meta"]);
    }
}
