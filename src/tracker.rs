/*============================================================
  Synavera Project: Syn-Upd
  Module: synupd_core::tracker
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Track how long each piece of software has had an update
    pending across daily runs, and decide when the user should
    be reminded about neglected updates.

  Security / Safety Notes:
    State lives in the user's own directory and is written
    atomically under an advisory lock. Corrupt or suspicious
    state is discarded, never partially trusted.

  Dependencies:
    serde_json for the state file, chrono for calendar dates.

  Operational Scope:
    Driven by the `track` subcommand: load, observe every
    pending update, ask once whether to notify, persist.

  Revision History:
    2025-11-12 COD  Authored staleness tracker.
  ------------------------------------------------------------
  SSE Principles Observed:
    - At most one pending-day increment per calendar day
    - Notification is about neglect, not mere availability
    - Best-effort state, fresh start over partial trust
============================================================*/

use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::error::{Result, SynupdError};
use crate::history::UpgradeHistory;
use crate::lock::StateLock;
use crate::logger::Logger;
use crate::update::{LogicalUpdate, UpdateType};

pub const TRACKER_VERSION: u32 = 1;
/// Age reported for a date or timestamp that was never recorded.
const UNKNOWN_AGE: i64 = 999;

/// Pending-update counters for one real source name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedUpdate {
    #[serde(rename = "type")]
    pub update_type: UpdateType,
    #[serde(with = "dotted_date")]
    pub since: NaiveDate,
    pub days: u32,
}

/// On-disk tracker document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerState {
    pub updates: BTreeMap<String, TrackedUpdate>,
    pub version: u32,
    #[serde(with = "dotted_date")]
    pub checked: NaiveDate,
    #[serde(with = "dotted_date")]
    pub notified: NaiveDate,
}

impl TrackerState {
    pub fn fresh(today: NaiveDate) -> Self {
        Self {
            updates: BTreeMap::new(),
            version: TRACKER_VERSION,
            checked: today,
            notified: today,
        }
    }

    fn validate(&self, today: NaiveDate) -> Result<()> {
        if self.version < TRACKER_VERSION {
            return Err(SynupdError::Serialization(format!(
                "Tracker schema {} is older than {TRACKER_VERSION}",
                self.version
            )));
        }
        if self.checked > today || self.notified > today {
            return Err(SynupdError::Serialization(
                "Tracker dates lie in the future".into(),
            ));
        }
        Ok(())
    }
}

/// `YYYY.MM.DD` calendar dates.
mod dotted_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y.%m.%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Durable staleness tracker for one machine.
pub struct UpdateTracker<'a> {
    path: PathBuf,
    config: TrackerConfig,
    state: TrackerState,
    refreshed: HashSet<String>,
    today: NaiveDate,
    max_days: u32,
    oldest_since_date: NaiveDate,
    active: bool,
    logger: &'a Logger,
    _lock: StateLock,
}

impl<'a> UpdateTracker<'a> {
    /// Open the tracker at `path` for today's run.
    pub fn open(path: &Path, config: TrackerConfig, logger: &'a Logger) -> Result<Self> {
        Self::open_at(path, config, Local::now().date_naive(), logger)
    }

    /// Open the tracker as if the run happened on `today`.
    pub fn open_at(
        path: &Path,
        config: TrackerConfig,
        today: NaiveDate,
        logger: &'a Logger,
    ) -> Result<Self> {
        let lock = lock_state(path, logger)?;
        Ok(Self::load_locked(path, config, today, logger, lock))
    }

    /// Replace the state file with `fixture` under the lock, then open it.
    pub fn open_with_fixture(
        path: &Path,
        fixture: &Path,
        config: TrackerConfig,
        logger: &'a Logger,
    ) -> Result<Self> {
        Self::open_with_fixture_at(path, fixture, config, Local::now().date_naive(), logger)
    }

    pub fn open_with_fixture_at(
        path: &Path,
        fixture: &Path,
        config: TrackerConfig,
        today: NaiveDate,
        logger: &'a Logger,
    ) -> Result<Self> {
        let lock = lock_state(path, logger)?;
        fs::copy(fixture, path).map_err(|err| {
            SynupdError::Filesystem(format!(
                "Failed to copy tracker fixture {}: {err}",
                fixture.display()
            ))
        })?;
        logger.info("TRACKER", format!("Seeded tracker from {}", fixture.display()));
        Ok(Self::load_locked(path, config, today, logger, lock))
    }

    fn load_locked(
        path: &Path,
        config: TrackerConfig,
        today: NaiveDate,
        logger: &'a Logger,
        lock: StateLock,
    ) -> Self {
        let (state, active) = match load_state(path, today) {
            Ok(state) => {
                let active = state.checked != today;
                if !active {
                    logger.info("TRACKER", "Already checked today; tracker inactive");
                }
                (state, active)
            }
            Err(err) => {
                logger.info("TRACKER", format!("Starting fresh tracker state: {err}"));
                (TrackerState::fresh(today), true)
            }
        };

        Self {
            path: path.to_path_buf(),
            config,
            state,
            refreshed: HashSet::new(),
            today,
            max_days: 0,
            oldest_since_date: today,
            active,
            logger,
            _lock: lock,
        }
    }

    /// `false` when the loaded state was already checked today.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    /// Largest pending-day count among qualifying updates seen this run.
    pub fn max_days_pending(&self) -> u32 {
        self.max_days
    }

    /// Earliest `since` date among qualifying updates seen this run.
    pub fn oldest_since_date(&self) -> NaiveDate {
        self.oldest_since_date
    }

    /// Record that `update` is still pending.
    pub fn observe(&mut self, update: &LogicalUpdate) {
        let name = update.real_source_name.clone();
        let first_sighting = self.refreshed.insert(name.clone());
        let new_day = self.state.checked < self.today;
        let today = self.today;

        let record = self
            .state
            .updates
            .entry(name)
            .and_modify(|record| {
                record.update_type = update.update_type;
                if first_sighting && new_day {
                    record.days = record.days.saturating_add(1);
                }
            })
            .or_insert_with(|| TrackedUpdate {
                update_type: update.update_type,
                since: today,
                days: 1,
            });

        let qualifies = matches!(update.update_type, UpdateType::Security | UpdateType::Kernel)
            || !self.config.security_only;
        if qualifies {
            self.max_days = self.max_days.max(record.days);
            self.oldest_since_date = self.oldest_since_date.min(record.since);
        }
    }

    /// Decide whether to remind the user; stamps the notified date on `true`.
    pub fn should_notify(&mut self, history: &dyn UpgradeHistory) -> bool {
        if !self.config.notifications_enabled {
            return false;
        }

        let notified_age = self.days_since(self.state.notified);
        if notified_age < self.config.days_between_notifications {
            self.logger.info(
                "TRACKER",
                format!("Notification age is too small: {notified_age} days"),
            );
            return false;
        }

        let mut needs_notify = false;
        if self.max_days >= self.config.max_days {
            self.logger
                .info("TRACKER", format!("Max days reached: {} days", self.max_days));
            needs_notify = true;
        } else {
            let max_age = self.days_since(self.oldest_since_date);
            if max_age >= self.config.max_age {
                self.logger
                    .info("TRACKER", format!("Max age reached: {max_age} days"));
                needs_notify = true;
            }
        }

        if needs_notify && !self.config.test_mode && self.recently_upgraded(history) {
            needs_notify = false;
        }

        if needs_notify {
            self.state.notified = self.today;
        }
        needs_notify
    }

    fn recently_upgraded(&self, history: &dyn UpgradeHistory) -> bool {
        let grace = self.config.grace_period;

        let install_age = self.days_since_timestamp(self.config.install_last_run);
        if install_age <= grace {
            self.logger.info(
                "TRACKER",
                format!("Manual update ran recently: {install_age} days ago"),
            );
            return true;
        }

        if let Some(upgraded) = history.latest_upgrade() {
            let upgrade_age = self.days_since(upgraded);
            if upgrade_age <= grace {
                self.logger.info(
                    "TRACKER",
                    format!("APT upgrades were taken recently: {upgrade_age} days ago"),
                );
                return true;
            }
        }
        false
    }

    fn days_since(&self, date: NaiveDate) -> i64 {
        (self.today - date).num_days()
    }

    fn days_since_timestamp(&self, timestamp: i64) -> i64 {
        if timestamp == 0 {
            return UNKNOWN_AGE;
        }
        DateTime::from_timestamp(timestamp, 0)
            .map(|moment| self.days_since(moment.with_timezone(&Local).date_naive()))
            .unwrap_or(UNKNOWN_AGE)
    }

    /// Forget software no longer pending, stamp today and write the state.
    pub fn persist(&mut self) -> Result<()> {
        let refreshed = &self.refreshed;
        self.state.updates.retain(|name, _| refreshed.contains(name));
        self.state.checked = self.today;
        write_state(&self.path, &self.state)?;
        self.logger.debug(
            "TRACKER",
            format!(
                "Persisted {} tracked updates to {}",
                self.state.updates.len(),
                self.path.display()
            ),
        );
        Ok(())
    }
}

fn lock_state(path: &Path, logger: &Logger) -> Result<StateLock> {
    let lock_path = lock_path(path);
    if let Some(lock) = StateLock::try_acquire(&lock_path)? {
        return Ok(lock);
    }
    logger.info(
        "TRACKER",
        format!("Waiting for tracker lock {}", lock_path.display()),
    );
    StateLock::acquire(&lock_path)
}

fn lock_path(path: &Path) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(".lock");
    PathBuf::from(raw)
}

fn load_state(path: &Path, today: NaiveDate) -> Result<TrackerState> {
    let raw = fs::read_to_string(path).map_err(|err| {
        SynupdError::Filesystem(format!("Failed to read {}: {err}", path.display()))
    })?;
    let state: TrackerState = serde_json::from_str(&raw).map_err(|err| {
        SynupdError::Serialization(format!("Failed to decode {}: {err}", path.display()))
    })?;
    state.validate(today)?;
    Ok(state)
}

fn write_state(path: &Path, state: &TrackerState) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            SynupdError::Filesystem(format!(
                "Failed to create tracker directory {}: {err}",
                parent.display()
            ))
        })?;
    }

    let mut temp = path.as_os_str().to_os_string();
    temp.push(".tmp");
    let temp_path = PathBuf::from(temp);

    let file = File::create(&temp_path).map_err(|err| {
        SynupdError::Filesystem(format!(
            "Failed to create tracker file {}: {err}",
            temp_path.display()
        ))
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, state).map_err(|err| {
        SynupdError::Serialization(format!("Failed to encode tracker state: {err}"))
    })?;
    writer.flush()?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|err| SynupdError::Filesystem(format!("Failed to sync tracker file: {err}")))?;

    fs::rename(&temp_path, path).map_err(|err| {
        SynupdError::Filesystem(format!(
            "Failed to move tracker file into place at {}: {err}",
            path.display()
        ))
    })
}
