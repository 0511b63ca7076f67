/*============================================================
  Synavera Project: Syn-Upd
  Module: synupd_core::report
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Render aggregated updates for consumers: a JSON report
    document, wire records, and a plain listing.

  Security / Safety Notes:
    Reports are written to operator-controlled paths; no
    privileged operations are performed.

  Dependencies:
    serde for JSON serialization, chrono for the report stamp.

  Operational Scope:
    Output stage of the `check`, `list` and `flatpak`
    subcommands.

  Revision History:
    2025-11-12 COD  Adapted manifest writer into update reports.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic ordering for reproducible reports
    - Rich metadata for audit and observability
============================================================*/

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::error::{Result, SynupdError};
use crate::update::{LogicalUpdate, UpdateType};

/// Full report document.
#[derive(Debug, Serialize)]
pub struct UpdateReport<'a> {
    pub metadata: ReportMetadata,
    pub updates: Vec<&'a LogicalUpdate>,
}

/// Counts describing the report context.
#[derive(Debug, Serialize)]
pub struct ReportMetadata {
    pub generated_at: String,
    pub generated_by: String,
    pub total_updates: usize,
    pub security_updates: usize,
    pub kernel_updates: usize,
    pub package_count: usize,
    pub download_size_total: u64,
}

impl<'a> UpdateReport<'a> {
    pub fn build(updates: Vec<&'a LogicalUpdate>) -> Self {
        let count = |kind: UpdateType| updates.iter().filter(|u| u.update_type == kind).count();
        let metadata = ReportMetadata {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            generated_by: "synupd_core".to_string(),
            total_updates: updates.len(),
            security_updates: count(UpdateType::Security),
            kernel_updates: count(UpdateType::Kernel),
            package_count: updates.iter().map(|u| u.package_names.len()).sum(),
            download_size_total: updates
                .iter()
                .fold(0u64, |total, u| total.saturating_add(u.size)),
        };
        Self { metadata, updates }
    }
}

/// One `type source_name new_version` line per update.
pub fn listing(updates: &[&LogicalUpdate]) -> Vec<String> {
    updates
        .iter()
        .map(|u| format!("{:<15} {:<45} {}", u.update_type, u.source_name, u.new_version))
        .collect()
}

/// Wire records, one per line.
pub fn wire_records(updates: &[&LogicalUpdate]) -> Vec<String> {
    updates.iter().map(|u| u.to_wire()).collect()
}

/// Persist any serializable document as pretty JSON.
pub fn write_json<T: Serialize + ?Sized>(document: &T, path: &Path) -> Result<()> {
    create_parent(path)?;
    let file = File::create(path).map_err(|err| {
        SynupdError::Filesystem(format!(
            "Failed to create report file {}: {err}",
            path.display()
        ))
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, document).map_err(|err| {
        SynupdError::Filesystem(format!("Failed to write report {}: {err}", path.display()))
    })?;
    writer.flush()?;
    Ok(())
}

/// Persist an already rendered document.
pub fn write_text(contents: &str, path: &Path) -> Result<()> {
    create_parent(path)?;
    std::fs::write(path, contents).map_err(|err| {
        SynupdError::Filesystem(format!("Failed to write report {}: {err}", path.display()))
    })
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| {
            SynupdError::Filesystem(format!(
                "Failed to create report directory {}: {err}",
                parent.display()
            ))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package_info::{PackageOrigin, RawPackageRecord};
    use tempfile::TempDir;

    fn update(source: &str, section: &str, size: u64) -> LogicalUpdate {
        let record = RawPackageRecord {
            name: source.to_string(),
            candidate_version: "1.2".to_string(),
            installed_version: Some("1.1".to_string()),
            size,
            source_name: source.to_string(),
            source_version: "1.2".to_string(),
            section: section.to_string(),
            origins: vec![PackageOrigin::default()],
            ..RawPackageRecord::default()
        };
        LogicalUpdate::from_package(&record, None)
    }

    #[test]
    fn test_report_counts() {
        let vlc = update("vlc", "video", 10);
        let kernel = update("linux", "kernel", u64::MAX);
        let report = UpdateReport::build(vec![&kernel, &vlc]);
        assert_eq!(report.metadata.total_updates, 2);
        assert_eq!(report.metadata.kernel_updates, 1);
        assert_eq!(report.metadata.security_updates, 0);
        assert_eq!(report.metadata.package_count, 2);
        assert_eq!(report.metadata.download_size_total, u64::MAX);
    }

    #[test]
    fn test_listing_columns() {
        let vlc = update("vlc", "video", 10);
        let lines = listing(&[&vlc]);
        let columns: Vec<&str> = lines[0].split_whitespace().collect();
        assert_eq!(columns, ["package", "vlc", "1.2"]);
    }

    #[test]
    fn test_listing_keeps_long_names_apart() {
        let long = update("libreoffice-help-common-extra-long-source-name", "editors", 10);
        assert!(long.source_name.len() > 45);
        let lines = listing(&[&long]);
        let columns: Vec<&str> = lines[0].split_whitespace().collect();
        assert_eq!(columns, ["package", long.source_name.as_str(), "1.2"]);
        assert_eq!(format!("[{:>9}]", UpdateType::Kernel), "[   kernel]");
    }

    #[test]
    fn test_wire_records_decode_back() {
        let vlc = update("vlc", "video", 10);
        let kernel = update("linux", "kernel", 20);
        let lines = wire_records(&[&vlc, &kernel]);
        assert_eq!(lines.len(), 2);
        assert_eq!(LogicalUpdate::parse_wire(&lines[0]).unwrap(), vlc);
        assert_eq!(LogicalUpdate::parse_wire(&lines[1]).unwrap(), kernel);
    }

    #[test]
    fn test_write_json_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports").join("updates.json");
        let vlc = update("vlc", "video", 10);
        write_json(&UpdateReport::build(vec![&vlc]), &path).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["metadata"]["generated_by"], "synupd_core");
        assert_eq!(written["updates"][0]["source_name"], "vlc");
        assert_eq!(written["updates"][0]["update_type"], "package");

        let text_path = dir.path().join("flatpak").join("updates.json");
        write_text("[]", &text_path).unwrap();
        assert_eq!(std::fs::read_to_string(&text_path).unwrap(), "[]");
    }
}
