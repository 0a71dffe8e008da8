// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Courier - claim-based email, SMS, and push dispatch queue workers.
//!
//! This is the binary entry point. Each worker subcommand performs one pass
//! over its channel table and is meant to be triggered by an external
//! scheduler such as cron.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod memory;
mod release;
mod stats;
mod worker;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use courier_config::CourierConfig;
use courier_core::{Channel, CourierError};

/// Courier - claim-based dispatch queue workers.
#[derive(Parser, Debug)]
#[command(name = "courier", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Dispatch one batch from the email queue.
    EmailQueueWorker(WorkerArgs),
    /// Dispatch one batch from the SMS queue.
    SmsQueueWorker(WorkerArgs),
    /// Dispatch one batch from the push queue.
    PushQueueWorker(WorkerArgs),
    /// Return stalled claims to the pending pool.
    Release(ReleaseArgs),
    /// Show per-channel queue counts.
    Stats {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Arguments shared by the worker subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct WorkerArgs {
    /// Informational run date, logged only.
    #[arg(long)]
    pub date: Option<String>,

    /// Maximum items to claim, overriding `queue.batch_size`.
    #[arg(long = "batch-size", visible_alias = "max-jobs", value_name = "N",
          value_parser = clap::value_parser!(u32).range(1..))]
    pub batch_size: Option<u32>,

    /// Print a run summary and enable debug logging.
    #[arg(long, short)]
    pub verbose: bool,
}

/// Arguments for `courier release`.
#[derive(Args, Debug)]
pub struct ReleaseArgs {
    /// Channel whose queue to release (email, sms, push).
    pub channel: Channel,

    #[command(flatten)]
    pub target: ReleaseTarget,
}

/// Which claims to release. Exactly one must be given.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct ReleaseTarget {
    /// Release rows claimed by this agent id.
    #[arg(long, value_name = "ID")]
    pub agent: Option<String>,

    /// Release claims not touched for at least this many seconds.
    #[arg(long, value_name = "N")]
    pub idle_secs: Option<u64>,

    /// Release every claimed row.
    #[arg(long)]
    pub all: bool,
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Commands::EmailQueueWorker(args)
            | Commands::SmsQueueWorker(args)
            | Commands::PushQueueWorker(args) => args.verbose,
            _ => false,
        }
    }
}

/// Process exit status for a failed command.
fn exit_code(err: &CourierError) -> i32 {
    match err {
        CourierError::Forbidden { .. } => 3,
        e if e.is_fatal() => 2,
        _ => 1,
    }
}

fn load_config(path: Option<&PathBuf>) -> CourierConfig {
    let loaded = match path {
        Some(path) => courier_config::load_and_validate_path(path),
        None => courier_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            courier_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());
    init_tracing(&config.log.level, cli.command.verbose());

    let result = match cli.command {
        Commands::EmailQueueWorker(args) => worker::run_worker(&config, Channel::Email, &args).await,
        Commands::SmsQueueWorker(args) => worker::run_worker(&config, Channel::Sms, &args).await,
        Commands::PushQueueWorker(args) => worker::run_worker(&config, Channel::Push, &args).await,
        Commands::Release(args) => release::run_release(&config, &args).await,
        Commands::Stats { json } => stats::run_stats(&config, json).await,
    };

    if let Err(e) = result {
        eprintln!("courier: {e}");
        std::process::exit(exit_code(&e));
    }
}

/// Initializes the tracing subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str, verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let level = if verbose { "debug" } else { log_level };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("courier={level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports epoch advance; the system allocator would fail.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn worker_accepts_max_jobs_alias() {
        let cli = Cli::try_parse_from([
            "courier",
            "sms-queue-worker",
            "--max-jobs",
            "25",
            "--date",
            "2026-10-18",
            "--verbose",
        ])
        .unwrap();
        match cli.command {
            Commands::SmsQueueWorker(args) => {
                assert_eq!(args.batch_size, Some(25));
                assert_eq!(args.date.as_deref(), Some("2026-10-18"));
                assert!(args.verbose);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn worker_rejects_zero_batch() {
        assert!(Cli::try_parse_from(["courier", "email-queue-worker", "--batch-size", "0"]).is_err());
    }

    #[test]
    fn release_requires_exactly_one_target() {
        assert!(Cli::try_parse_from(["courier", "release", "push"]).is_err());
        assert!(
            Cli::try_parse_from(["courier", "release", "push", "--all", "--idle-secs", "60"]).is_err()
        );

        let cli = Cli::try_parse_from(["courier", "--config", "/tmp/c.toml", "release", "push", "--agent", "a-1"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        let Commands::Release(args) = cli.command else {
            panic!("expected release");
        };
        assert_eq!(args.channel, Channel::Push);
        assert_eq!(args.target.agent.as_deref(), Some("a-1"));
    }

    #[test]
    fn release_rejects_unknown_channel() {
        assert!(Cli::try_parse_from(["courier", "release", "fax", "--all"]).is_err());
    }

    #[test]
    fn exit_codes_separate_failure_classes() {
        assert_eq!(exit_code(&CourierError::Forbidden { origin: "http".into() }), 3);
        assert_eq!(
            exit_code(&CourierError::Timeout {
                duration: std::time::Duration::from_secs(1)
            }),
            2
        );
        assert_eq!(
            exit_code(&CourierError::ResourceLimit {
                resource: "memory".into(),
                limit: 1,
                observed: 2
            }),
            2
        );
        assert_eq!(exit_code(&CourierError::Config("x".into())), 1);
        assert_eq!(exit_code(&CourierError::storage(std::io::Error::other("disk"))), 1);
    }

    #[test]
    fn verbose_flag_only_applies_to_workers() {
        let cli = Cli::try_parse_from(["courier", "push-queue-worker", "-v"]).unwrap();
        assert!(cli.command.verbose());
        let cli = Cli::try_parse_from(["courier", "stats", "--json"]).unwrap();
        assert!(!cli.command.verbose());
    }
}
