// src/main.rs
//! Operator console entry point: one subcommand per workflow, matching
//! spec.md §6's job CLI surface plus the `full`/`init` subcommands this
//! crate supplements (see SPEC_FULL.md §2).

use clap::{Parser, Subcommand};
use encheres_scraper::{AppConfig, Orchestrator};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "scrape", about = "Licitor auction crawler")]
struct Cli {
    /// Verbosity for the pretty_env_logger backend.
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Create the sqlite store and run schema migrations, then exit.
    Init,
    /// Scrape the tribunal index and every active tribunal's upcoming hearings.
    Incremental,
    /// Same as incremental, plus the three backfill passes.
    Full,
    /// Walk every tribunal's history backwards through past hearings.
    History {
        #[arg(long)]
        max_hearings: Option<usize>,
        #[arg(long, num_args = 1.., value_name = "SLUG")]
        tribunals: Option<Vec<String>>,
    },
    /// Fill in missing listing detail pages.
    Backfill {
        #[arg(long, default_value_t = 500)]
        limit: i64,
    },
    /// Fill in missing starting prices ("mise à prix").
    MapBackfill {
        #[arg(long, default_value_t = 500)]
        limit: i64,
    },
    /// Fill in missing surface areas.
    SurfaceBackfill {
        #[arg(long, default_value_t = 500)]
        limit: i64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    std::env::set_var("RUST_LOG", cli.log_level.as_filter());
    pretty_env_logger::init();

    let cfg = AppConfig::from_env();

    if matches!(cli.command, Command::Init) {
        return match encheres_scraper::db::Store::new(cfg.store.db_path.clone()).initialize() {
            Ok(()) => {
                log::info!("store initialized at {}", cfg.store.db_path);
                ExitCode::SUCCESS
            }
            Err(e) => {
                log::error!("failed to initialize store: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let orchestrator = match Orchestrator::new(cfg) {
        Ok(o) => o,
        Err(e) => {
            log::error!("failed to start up: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Init => unreachable!("handled above"),
        Command::Incremental => orchestrator.run_incremental(),
        Command::Full => orchestrator.run_full(),
        Command::History { max_hearings, tribunals } => {
            orchestrator.run_history_backfill(max_hearings, tribunals.as_deref())
        }
        Command::Backfill { limit } => orchestrator.run_detail_backfill(limit),
        Command::MapBackfill { limit } => orchestrator.run_map_backfill(limit),
        Command::SurfaceBackfill { limit } => orchestrator.run_surface_backfill(limit),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("job failed: {e}");
            ExitCode::FAILURE
        }
    }
}
