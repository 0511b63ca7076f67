/*============================================================
  Synavera Project: Syn-Upd
  Module: synupd_core::history
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Find the most recent completed upgrade in the package
    manager's transaction history.

  Security / Safety Notes:
    Read-only access to /var/log/apt; unreadable or malformed
    logs count as "no upgrade found".

  Dependencies:
    flate2 for rotated gzip logs, glob to find them, chrono for
    dates.

  Operational Scope:
    Consulted by the tracker's notification suppression.

  Revision History:
    2025-11-12 COD  Authored history log scanner.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Failures degrade to a neutral answer
    - Streaming decompression, no temporary files
============================================================*/

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use flate2::read::GzDecoder;

use crate::logger::Logger;

const UPGRADE_ACTION: &str = "Upgrade: ";
const END_DATE_FIELD: &str = "End-Date: ";
const END_DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of the last upgrade performed outside this tool.
pub trait UpgradeHistory {
    fn latest_upgrade(&self) -> Option<NaiveDate>;
}

/// apt's `history.log` plus its rotated `history.log.N.gz` siblings.
pub struct AptHistoryLog<'a> {
    path: PathBuf,
    logger: &'a Logger,
}

impl<'a> AptHistoryLog<'a> {
    pub fn new(path: impl Into<PathBuf>, logger: &'a Logger) -> Self {
        Self {
            path: path.into(),
            logger,
        }
    }

    fn rotated_logs(&self) -> Vec<PathBuf> {
        let pattern = format!("{}*.gz", glob::Pattern::escape(&self.path.to_string_lossy()));
        match glob::glob(&pattern) {
            Ok(paths) => {
                let mut rotated: Vec<PathBuf> = paths.filter_map(|entry| entry.ok()).collect();
                rotated.sort();
                rotated
            }
            Err(err) => {
                self.logger
                    .warn("HISTORY", format!("Invalid rotated log pattern {pattern}: {err}"));
                Vec::new()
            }
        }
    }

    fn read_gzip(&self, path: &Path) -> Option<String> {
        let file = File::open(path).ok()?;
        let mut contents = Vec::new();
        match GzDecoder::new(file).read_to_end(&mut contents) {
            Ok(_) => Some(String::from_utf8_lossy(&contents).into_owned()),
            Err(err) => {
                self.logger.warn(
                    "HISTORY",
                    format!("Failed to decompress {}: {err}", path.display()),
                );
                None
            }
        }
    }
}

impl UpgradeHistory for AptHistoryLog<'_> {
    fn latest_upgrade(&self) -> Option<NaiveDate> {
        let plain = fs::read(&self.path)
            .ok()
            .and_then(|contents| latest_upgrade_in(&String::from_utf8_lossy(&contents)));
        if plain.is_some() {
            return plain;
        }

        self.rotated_logs()
            .iter()
            .filter_map(|path| self.read_gzip(path))
            .filter_map(|contents| latest_upgrade_in(&contents))
            .max()
    }
}

/// Latest `End-Date` among history blocks that contain an upgrade.
pub fn latest_upgrade_in(log: &str) -> Option<NaiveDate> {
    let normalized = log.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .filter(|block| block.contains(UPGRADE_ACTION))
        .filter_map(|block| {
            block
                .lines()
                .map(str::trim)
                .filter_map(|line| line.strip_prefix(END_DATE_FIELD))
                .last()
                .and_then(|value| value.split_whitespace().next())
                .and_then(|date| NaiveDate::parse_from_str(date, END_DATE_FORMAT).ok())
        })
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    const HISTORY: &str = "\
Start-Date: 2024-05-01  10:00:01
Commandline: apt-get install htop
Install: htop:amd64 (3.3.0-4)
End-Date: 2024-05-01  10:00:05

Start-Date: 2024-05-03  09:12:44
Commandline: apt-get dist-upgrade
Upgrade: bash:amd64 (5.2-1, 5.2-2)
End-Date: 2024-05-03  09:13:10

Start-Date: 2024-05-02  08:00:00
Upgrade: curl:amd64 (8.5-1, 8.5-2)
End-Date: 2024-05-02  08:01:00

Start-Date: 2024-05-09  07:00:00
Install: vim:amd64 (9.1)
End-Date: 2024-05-09  07:00:09
";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_latest_upgrade_ignores_install_only_blocks() {
        assert_eq!(latest_upgrade_in(HISTORY), Some(date(2024, 5, 3)));
    }

    #[test]
    fn test_malformed_log_means_no_upgrade() {
        assert_eq!(latest_upgrade_in(""), None);
        assert_eq!(latest_upgrade_in("Upgrade: x\nEnd-Date: yesterday"), None);
        assert_eq!(latest_upgrade_in("Upgrade: x (1, 2)"), None);
    }

    #[test]
    fn test_invalid_utf8_does_not_hide_upgrades() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("history.log");
        let mut contents = b"Start-Date: 2024-05-03  09:12:44\nCommandline: apt install caf\xe9\n".to_vec();
        contents.extend_from_slice(b"Upgrade: bash:amd64 (5.2-1, 5.2-2)\nEnd-Date: 2024-05-03  09:13:10\n");
        std::fs::write(&plain, contents).unwrap();

        let logger = Logger::stderr_only(false);
        let history = AptHistoryLog::new(&plain, &logger);
        assert_eq!(history.latest_upgrade(), Some(date(2024, 5, 3)));
    }

    #[test]
    fn test_missing_log_is_not_an_error() {
        let logger = Logger::stderr_only(false);
        let history = AptHistoryLog::new("/nonexistent/apt/history.log", &logger);
        assert_eq!(history.latest_upgrade(), None);
    }

    #[test]
    fn test_rotated_gzip_logs_are_scanned_when_plain_log_is_quiet() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("history.log");
        std::fs::write(&plain, "Start-Date: 2024-06-01  10:00:00\nInstall: a (1)\nEnd-Date: 2024-06-01  10:00:01\n").unwrap();

        for (index, day) in [(1, "2024-04-20"), (2, "2024-03-11")] {
            let file = File::create(dir.path().join(format!("history.log.{index}.gz"))).unwrap();
            let mut encoder = GzEncoder::new(file, Compression::default());
            write!(encoder, "Start-Date: {day}  10:00:00\nUpgrade: a (1, 2)\nEnd-Date: {day}  10:00:05\n").unwrap();
            encoder.finish().unwrap();
        }
        std::fs::write(dir.path().join("history.log.3.gz"), b"not gzip").unwrap();
        std::fs::write(dir.path().join("term.log.1.gz"), b"unrelated").unwrap();

        let logger = Logger::stderr_only(false);
        let history = AptHistoryLog::new(&plain, &logger);
        assert_eq!(history.latest_upgrade(), Some(date(2024, 4, 20)));
    }
}
