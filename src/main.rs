/*============================================================
  Synavera Project: Syn-Upd
  Module: synupd_core::main
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Entry point for Syn-Upd Core. Folds raw package and ref
    records into logical updates, reports them, and tracks how
    long they stay pending to decide when to remind the user.

  Security / Safety Notes:
    Operates within user privileges. Executes only the
    operator-supplied scanner command; never installs anything.

  Dependencies:
    clap for CLI parsing, tokio runtime, chrono for timestamps.

  Operational Scope:
    Invoked by the updater front end or a daily timer via
    `synupd_core <check|list|flatpak|track|kernel>`.

  Revision History:
    2025-11-12 COD  Authored Syn-Upd Core runtime.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Result-first error handling with deterministic exits
    - Structured logging following Synavera cadence
    - Configurable execution via CLI and config file
============================================================*/

mod aggregate;
mod alias;
mod blacklist;
mod collector;
mod config;
mod error;
mod flatpak;
mod history;
mod kernel;
mod keyfile;
mod lock;
mod logger;
mod package_info;
mod report;
mod tracker;
mod update;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{ArgAction, Args, Parser, Subcommand};

use aggregate::{UpdateFilter, UpdateSet};
use blacklist::Blacklist;
use collector::RecordSource;
use config::SynupdConfig;
use error::Result;
use flatpak::{aggregate_refs, FlatpakLogicalUpdate, RefDescriptor};
use history::AptHistoryLog;
use kernel::KernelVersion;
use logger::Logger;
use package_info::RawPackageRecord;
use report::{listing, wire_records, write_json, write_text, UpdateReport};
use tracker::UpdateTracker;

/// Command-line arguments for Syn-Upd-Core.
#[derive(Debug, Parser)]
#[command(
    name = "Syn-Upd-Core",
    version,
    author = "Synavera Systems",
    about = "Update aggregation and staleness tracking for Syn-Upd"
)]
struct Cli {
    /// Override configuration file path.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Explicit log file path.
    #[arg(long, value_name = "PATH", global = true)]
    log: Option<PathBuf>,
    /// Enable verbose logging to stderr.
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Emit one wire record per pending update.
    Check {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        filter: FilterArgs,
        /// Also write a JSON report to this path.
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Print `type source_name new_version` for each pending update.
    List {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Fold Flatpak ref descriptors into apps and runtimes.
    Flatpak {
        #[command(flatten)]
        input: InputArgs,
        /// Write the JSON array here instead of stdout.
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Record pending updates and decide whether to remind the user.
    Track {
        #[command(flatten)]
        input: InputArgs,
        /// Comma-separated extra ignore entries.
        #[arg(long, value_name = "LIST")]
        ignore: Option<String>,
        /// Seed the tracker from a fixture and enable test mode.
        #[arg(long, value_name = "PATH")]
        fixture: Option<PathBuf>,
    },
    /// Print the comparison key of each kernel version, in order.
    Kernel {
        #[arg(value_name = "VERSION", required = true)]
        versions: Vec<String>,
    },
}

#[derive(Debug, Args)]
struct InputArgs {
    /// Read the record array from a file instead of stdin.
    #[arg(long, value_name = "PATH", conflicts_with = "source_command")]
    input: Option<PathBuf>,
    /// Run a scanner whose stdout is the record array.
    #[arg(long, value_name = "ARGV", num_args = 1.., allow_hyphen_values = true)]
    source_command: Vec<String>,
}

impl InputArgs {
    fn source(&self) -> RecordSource<'_> {
        if !self.source_command.is_empty() {
            RecordSource::Command(&self.source_command)
        } else if let Some(path) = &self.input {
            RecordSource::File(path)
        } else {
            RecordSource::Stdin
        }
    }
}

#[derive(Debug, Args)]
struct FilterArgs {
    /// Comma-separated extra ignore entries (`pattern[=version]`).
    #[arg(long, value_name = "LIST")]
    ignore: Option<String>,
    /// Only kernel updates.
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "only_security")]
    only_kernel: bool,
    /// Only security updates.
    #[arg(long, action = ArgAction::SetTrue)]
    only_security: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("[Syn-Upd-Core] {}", err);
            err.exit_code()
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = SynupdConfig::load_from_optional_path(cli.config.as_deref())?;

    let session_stamp = Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let log_path = cli
        .log
        .clone()
        .or_else(|| Some(config.log_dir().join(format!("core_{session_stamp}.log"))));
    let logger = Logger::new(log_path, cli.verbose)?;
    logger.info("INIT", "Syn-Upd Core awakening.");

    match cli.command {
        Commands::Check {
            input,
            filter,
            output,
        } => {
            let updates = collect_updates(&input, &config, &logger).await?;
            let filter = build_filter(&config, &filter, &logger)?;
            let selected = updates.select(&filter);
            for line in wire_records(&selected) {
                println!("{line}");
            }
            if let Some(path) = output {
                write_json(&UpdateReport::build(selected.clone()), &path)?;
                logger.info("REPORT", format!("Report written to {}", path.display()));
            }
            logger.info("SUMMARY", format!("updates={}", selected.len()));
        }
        Commands::List { input, filter } => {
            let updates = collect_updates(&input, &config, &logger).await?;
            let filter = build_filter(&config, &filter, &logger)?;
            for line in listing(&updates.select(&filter)) {
                println!("{line}");
            }
        }
        Commands::Flatpak { input, output } => {
            let descriptors: Vec<RefDescriptor> = input.source().collect(&logger).await?;
            let updates = aggregate_refs(&descriptors, &logger);
            logger.info(
                "FLATPAK",
                format!("{} refs folded into {} updates", descriptors.len(), updates.len()),
            );
            let rendered = FlatpakLogicalUpdate::list_to_json(&updates)?;
            match output {
                Some(path) => write_text(&rendered, &path)?,
                None => println!("{rendered}"),
            }
        }
        Commands::Track {
            input,
            ignore,
            fixture,
        } => {
            let updates = collect_updates(&input, &config, &logger).await?;
            let filter = UpdateFilter {
                blacklist: Blacklist::load(Some(config.general.blacklist_path.as_path()), ignore.as_deref(), &logger)?,
                priority_updates: config.general.priority_updates.clone(),
                ..UpdateFilter::default()
            };
            track(updates.select(&filter), &config, fixture, &logger)?;
        }
        Commands::Kernel { versions } => {
            let mut keys: Vec<KernelVersion> = versions.iter().map(|v| KernelVersion::new(v)).collect();
            keys.sort();
            for key in keys {
                println!("{}\t{}", key.version(), key.key());
            }
        }
    }

    logger.info("COMPLETE", "Consciousness synchronised.");
    logger.finalize()?;
    Ok(ExitCode::SUCCESS)
}

async fn collect_updates(input: &InputArgs, config: &SynupdConfig, logger: &Logger) -> Result<UpdateSet> {
    let records: Vec<RawPackageRecord> = input.source().collect(logger).await?;
    logger.info("PACKAGES", format!("Collected {} package records", records.len()));
    Ok(UpdateSet::from_records(&records, &config.aliases, logger))
}

fn build_filter(config: &SynupdConfig, args: &FilterArgs, logger: &Logger) -> Result<UpdateFilter> {
    let blacklist = Blacklist::load(Some(config.general.blacklist_path.as_path()), args.ignore.as_deref(), logger)?;
    logger.debug("BLACKLIST", format!("{} ignore entries", blacklist.len()));
    Ok(UpdateFilter {
        only_kernel: args.only_kernel,
        only_security: args.only_security,
        blacklist,
        priority_updates: config.general.priority_updates.clone(),
    })
}

fn track(
    pending: Vec<&update::LogicalUpdate>,
    config: &SynupdConfig,
    fixture: Option<PathBuf>,
    logger: &Logger,
) -> Result<()> {
    let state_path = config.state_path();
    let mut tracker_config = config.tracker.clone();
    let mut tracker = match fixture {
        Some(fixture) => {
            tracker_config.test_mode = true;
            UpdateTracker::open_with_fixture(&state_path, &fixture, tracker_config, logger)?
        }
        None => UpdateTracker::open(&state_path, tracker_config, logger)?,
    };
    for update in &pending {
        tracker.observe(update);
    }

    let notify = if tracker.is_active() {
        let history = AptHistoryLog::new(&config.general.apt_history_path, logger);
        tracker.should_notify(&history)
    } else {
        false
    };
    tracker.persist()?;

    println!(
        "notify={notify} pending={} max_days={} oldest={}",
        pending.len(),
        tracker.max_days_pending(),
        tracker.oldest_since_date().format("%Y.%m.%d")
    );
    Ok(())
}
