/*============================================================
  Synavera Project: Syn-Upd
  Module: synupd_core::collector
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Gather raw package and ref records from an external
    scanner command, a file, or standard input.

  Security / Safety Notes:
    Executes the operator-supplied scanner with user privileges
    only; no shell is involved in the invocation.

  Dependencies:
    tokio::process for async command execution, serde_json for
    record decoding.

  Operational Scope:
    Feeds the aggregation passes of the `check`, `list`,
    `track` and `flatpak` subcommands.

  Revision History:
    2025-11-12 COD  Adapted command layer into record collector.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic command invocation with explicit checks
    - One malformed record never hides the others
    - Reusable helpers for external command diagnostics
============================================================*/

use std::io;
use std::path::Path;
use std::process::Stdio;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::error::{Result, SynupdError};
use crate::logger::Logger;

/// Where raw records come from.
#[derive(Debug, Clone)]
pub enum RecordSource<'a> {
    /// Program and arguments whose stdout is the record array.
    Command(&'a [String]),
    File(&'a Path),
    Stdin,
}

impl RecordSource<'_> {
    /// Read the raw JSON document.
    pub async fn read(&self) -> Result<String> {
        match self {
            RecordSource::Command(argv) => run_scanner(argv).await,
            RecordSource::File(path) => tokio::fs::read_to_string(path).await.map_err(|err| {
                SynupdError::Filesystem(format!("Failed to read {}: {err}", path.display()))
            }),
            RecordSource::Stdin => {
                let mut raw = String::new();
                tokio::io::stdin().read_to_string(&mut raw).await?;
                Ok(raw)
            }
        }
    }

    /// Read and decode every record, skipping the ones that fail.
    pub async fn collect<T: DeserializeOwned>(&self, logger: &Logger) -> Result<Vec<T>> {
        let raw = self.read().await?;
        decode_records(&raw, logger)
    }
}

/// Run a scanner command and capture its stdout.
pub async fn run_scanner(argv: &[String]) -> Result<String> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| SynupdError::Config("Scanner command is empty".into()))?;

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|err| map_spawn_error(err, program))?;

    if !output.status.success() {
        return Err(SynupdError::CommandFailure {
            command: argv.join(" "),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    String::from_utf8(output.stdout).map_err(|err| {
        SynupdError::Serialization(format!("{program} emitted invalid UTF-8: {err}"))
    })
}

/// Decode a JSON array element by element.
///
/// A document that is not an array is an error; an element that does not
/// decode is logged and dropped.
pub fn decode_records<T: DeserializeOwned>(raw: &str, logger: &Logger) -> Result<Vec<T>> {
    let elements: Vec<Value> = serde_json::from_str(raw)
        .map_err(|err| SynupdError::Serialization(format!("Record input is not a JSON array: {err}")))?;

    let total = elements.len();
    let mut records = Vec::with_capacity(total);
    for (index, element) in elements.into_iter().enumerate() {
        match serde_json::from_value(element) {
            Ok(record) => records.push(record),
            Err(err) => logger.warn("RECORD", format!("Skipping record #{index}: {err}")),
        }
    }
    logger.debug("RECORD", format!("Decoded {}/{total} records", records.len()));
    Ok(records)
}

fn map_spawn_error(err: io::Error, command: &str) -> SynupdError {
    if err.kind() == io::ErrorKind::NotFound {
        SynupdError::CommandMissing {
            command: command.into(),
        }
    } else {
        SynupdError::Runtime(format!("Failed to spawn {command}: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package_info::RawPackageRecord;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const RECORDS: &str = r#"[
        {"name": "vlc", "candidate_version": "3.0.21", "installed_version": "3.0.20", "source_name": "vlc"},
        {"name": 42},
        {"name": "vlc-data", "candidate_version": "3.0.21", "source_name": "vlc"}
    ]"#;

    #[test]
    fn test_bad_records_are_skipped() {
        let logger = Logger::stderr_only(false);
        let records: Vec<RawPackageRecord> = decode_records(RECORDS, &logger).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["vlc", "vlc-data"]);
        assert_eq!(records[1].installed_version, None);
    }

    #[test]
    fn test_non_array_document_is_an_error() {
        let logger = Logger::stderr_only(false);
        let result: Result<Vec<RawPackageRecord>> = decode_records("{\"name\": \"vlc\"}", &logger);
        assert!(matches!(result, Err(SynupdError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_file_source() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{RECORDS}").unwrap();
        let logger = Logger::stderr_only(false);
        let records: Vec<RawPackageRecord> =
            RecordSource::File(file.path()).collect(&logger).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_scanner_command() {
        let argv = vec!["echo".to_string(), "[]".to_string()];
        let logger = Logger::stderr_only(false);
        let records: Vec<RawPackageRecord> =
            RecordSource::Command(&argv).collect(&logger).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_missing_and_failing_scanners() {
        let missing = vec!["synupd-no-such-scanner".to_string()];
        assert!(matches!(
            run_scanner(&missing).await,
            Err(SynupdError::CommandMissing { .. })
        ));

        let failing = vec!["false".to_string()];
        assert!(matches!(
            run_scanner(&failing).await,
            Err(SynupdError::CommandFailure { .. })
        ));

        assert!(matches!(run_scanner(&[]).await, Err(SynupdError::Config(_))));
    }
}
