/*============================================================
  Synavera Project: Syn-Upd
  Module: synupd_core::config
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Load Syn-Upd-Core configuration: state and log locations,
    ignore list, aliases and the tracker's nagging policy.

  Security / Safety Notes:
    Configuration is read-only; paths default to the invoking
    user's home directory.

  Dependencies:
    toml + serde for decoding, dirs for default locations.

  Operational Scope:
    Loaded once per invocation and passed explicitly to the
    aggregation pass and the tracker.

  Revision History:
    2025-11-12 COD  Authored configuration loader.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit configuration, no ambient globals
    - Every option carries a documented default
============================================================*/

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::alias::AliasTable;
use crate::error::{Result, SynupdError};

const CONFIG_DIR_NAME: &str = "synupd";
const CONFIG_FILE_NAME: &str = "config.toml";
const STATE_FILE_NAME: &str = "updates.json";

/// Root configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SynupdConfig {
    pub general: GeneralConfig,
    pub tracker: TrackerConfig,
    pub aliases: AliasTable,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub state_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub blacklist_path: PathBuf,
    pub apt_history_path: PathBuf,
    pub priority_updates: Vec<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            state_dir: None,
            log_dir: None,
            blacklist_path: PathBuf::from("/etc/mintupdate.blacklist"),
            apt_history_path: PathBuf::from("/var/log/apt/history.log"),
            priority_updates: vec!["mintupdate".to_string(), "mint-upgrade-info".to_string()],
        }
    }
}

/// Nagging policy for the staleness tracker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub notifications_enabled: bool,
    pub security_only: bool,
    pub days_between_notifications: i64,
    pub max_days: u32,
    pub max_age: i64,
    pub grace_period: i64,
    /// Epoch seconds of the last manual update run; 0 means never.
    pub install_last_run: i64,
    pub test_mode: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            security_only: false,
            days_between_notifications: 2,
            max_days: 15,
            max_age: 7,
            grace_period: 3,
            install_last_run: 0,
            test_mode: false,
        }
    }
}

impl SynupdConfig {
    /// Load from `path`, or from the user config file when `None`.
    ///
    /// A missing default file yields defaults; a missing explicit file is an error.
    pub fn load_from_optional_path(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => match default_config_path() {
                Some(default) if default.is_file() => Self::load_from_path(&default),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            SynupdError::Config(format!("Failed to read {}: {err}", path.display()))
        })?;
        Self::from_toml(&raw)
            .map_err(|err| SynupdError::Config(format!("{}: {err}", path.display())))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|err| SynupdError::Config(err.to_string()))
    }

    pub fn state_dir(&self) -> PathBuf {
        self.general.state_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(".synupd")
        })
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE_NAME)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.general
            .log_dir
            .clone()
            .unwrap_or_else(|| self.state_dir().join("logs"))
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = SynupdConfig::from_toml("").unwrap();
        assert!(config.tracker.notifications_enabled);
        assert_eq!(config.tracker.max_days, 15);
        assert_eq!(config.tracker.max_age, 7);
        assert_eq!(config.tracker.grace_period, 3);
        assert_eq!(config.general.priority_updates, ["mintupdate", "mint-upgrade-info"]);
        assert!(config.aliases.is_empty());
    }

    #[test]
    fn test_sections_and_aliases() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[general]
state_dir = "/tmp/synupd-state"
priority_updates = ["synupd"]

[tracker]
security_only = true
max_days = 30
install_last_run = 1700000000

[aliases.firefox-esr]
name = "firefox"
short_description = '_("Web browser")'
"#
        )
        .unwrap();

        let config = SynupdConfig::load_from_optional_path(Some(file.path())).unwrap();
        assert_eq!(config.state_path(), PathBuf::from("/tmp/synupd-state/updates.json"));
        assert_eq!(config.log_dir(), PathBuf::from("/tmp/synupd-state/logs"));
        assert!(config.tracker.security_only);
        assert_eq!(config.tracker.max_days, 30);
        assert_eq!(config.tracker.days_between_notifications, 2);
        assert_eq!(config.tracker.install_last_run, 1_700_000_000);
        let alias = config.aliases.get("firefox-esr").unwrap().normalized();
        assert_eq!(alias.name.as_deref(), Some("firefox"));
        assert_eq!(alias.short_description.as_deref(), Some("Web browser"));
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let err = SynupdConfig::load_from_optional_path(Some(Path::new("/nonexistent/synupd.toml")))
            .unwrap_err();
        assert!(matches!(err, SynupdError::Config(_)));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        assert!(matches!(
            SynupdConfig::from_toml("[tracker]\nmax_days = \"soon\""),
            Err(SynupdError::Config(_))
        ));
    }
}
