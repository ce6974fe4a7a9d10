//! CLI for vitalsync: health metrics from an on-device store with cloud fallback.

mod commands;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vitalsync")]
#[command(about = "vitalsync: one consistent view of health metrics from two unreliable sources")]
#[command(version = vitalsync_core::VERSION)]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that builds an engine.
#[derive(Args, Debug, Clone)]
struct EngineArgs {
    /// Engine config JSON (timeouts, fan-out, trend policy)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Simulated native store latency per read, in milliseconds
    #[arg(long, global = true, default_value = "0")]
    native_latency_ms: u64,

    /// Fraction of simulated native reads that fail (0.0 - 1.0)
    #[arg(long, global = true, default_value = "0")]
    native_failure_rate: f64,

    /// Comma-separated metric ids the simulated device never recorded
    #[arg(long, global = true, value_delimiter = ',')]
    native_missing: Vec<String>,

    /// Make the simulated cloud unreachable
    #[arg(long, global = true)]
    offline_cloud: bool,

    /// Base URL of a real cloud history API (replaces the simulated cloud)
    #[arg(long, global = true)]
    cloud_url: Option<String>,

    /// Bearer token for --cloud-url
    #[arg(long, global = true, env = "VITALSYNC_CLOUD_TOKEN", hide_env_values = true)]
    cloud_token: Option<String>,

    /// Seed for the simulated sources
    #[arg(long, global = true, default_value = "42")]
    seed: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// List the metric catalog
    Catalog {
        /// Only show one category (e.g. heart, sleep)
        #[arg(long)]
        category: Option<String>,
    },

    /// Every metric with data for one day
    Snapshot {
        /// Day to read, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Print the raw snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Readings and stats for one metric over a window
    Series {
        /// Metric id (see `vitalsync catalog`)
        metric: String,

        /// Window length in days
        #[arg(long, default_value = "7")]
        days: u32,

        /// Last day of the window, YYYY-MM-DD (default: today)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Print the raw series as JSON
        #[arg(long)]
        json: bool,
    },

    /// Headline metrics and per-category coverage for one day
    Summary {
        /// Day to read, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Number of headline metrics
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Serve snapshots and series over HTTP
    Server {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value = "8080")]
        port: u16,
    },
}

impl From<EngineArgs> for commands::EngineOptions {
    fn from(args: EngineArgs) -> Self {
        Self {
            config_path: args.config,
            native_latency_ms: args.native_latency_ms,
            native_failure_rate: args.native_failure_rate,
            native_missing: args.native_missing,
            offline_cloud: args.offline_cloud,
            cloud_url: args.cloud_url,
            cloud_token: args.cloud_token,
            seed: args.seed,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let opts = commands::EngineOptions::from(cli.engine);

    match cli.command {
        Commands::Catalog { category } => commands::catalog::run(category.as_deref()),
        Commands::Snapshot { date, json } => commands::snapshot::run(&opts, date, json),
        Commands::Series {
            metric,
            days,
            end,
            json,
        } => commands::series::run(&opts, &metric, days, end, json),
        Commands::Summary { date, top } => commands::summary::run(&opts, date, top),
        Commands::Server { host, port } => commands::server::run(&opts, &host, port),
    }
}
