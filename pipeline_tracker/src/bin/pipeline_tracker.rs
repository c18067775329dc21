use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use pipeline_tracker::{
    PipelineSettings, PipelineStatus, RecordFilter, SqliteTrackingStore, TrackerConfig,
    TrackingStore, bootstrap, db::migrate, get_next_n, load_config_path, run_gap_fill,
    tz::parse_rfc3339_utc,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Pipeline run tracking CLI")]
struct Cli {
    /// Tracker TOML file.
    #[arg(long, short, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Overrides `[store].database_url` and $DATABASE_URL.
    #[arg(long, global = true, value_name = "URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Apply pending schema migrations.
    Migrate,
    /// Insert PENDING records for every missing window.
    GapFill(PipelineArgs),
    /// Gap fill, then print the oldest PENDING records.
    Next(PipelineArgs),
    /// Create the first window of a pipeline with no records.
    Bootstrap {
        #[command(flatten)]
        pipeline: PipelineArgs,
        /// Window start (RFC-3339). Floored onto the window grid unless --exact.
        #[arg(long)]
        start: String,
        #[arg(long)]
        exact: bool,
    },
    /// Print records by status or id.
    Show {
        /// Limit to this pipeline's fetch filter.
        #[arg(long)]
        pipeline: Option<String>,
        #[arg(long, default_value = "PENDING")]
        status: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Print one record by tracking id instead.
        #[arg(long, conflicts_with_all = ["status", "pipeline"])]
        id: Option<i64>,
    },
}

#[derive(Args)]
struct PipelineArgs {
    /// Key under `[pipelines]`.
    #[arg(long)]
    pipeline: String,
    /// Evaluate as if it were this instant (RFC-3339); defaults to now.
    #[arg(long)]
    now: Option<String>,
}

impl PipelineArgs {
    fn now(&self) -> Result<DateTime<Utc>> {
        match &self.now {
            Some(text) => parse_rfc3339_utc(text).with_context(|| format!("--now {text}")),
            None => Ok(Utc::now()),
        }
    }
}

fn load(cli: &Cli) -> Result<TrackerConfig> {
    match &cli.config {
        Some(path) => load_config_path(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(TrackerConfig::default()),
    }
}

fn settings(cfg: &TrackerConfig, key: &str) -> Result<PipelineSettings> {
    if cfg.pipelines.is_empty() {
        bail!("--config is required for pipeline commands");
    }
    cfg.pipeline(key).with_context(|| format!("pipeline '{key}'"))
}

fn open_store(cli: &Cli, cfg: &TrackerConfig) -> Result<SqliteTrackingStore> {
    let url = match &cli.database_url {
        Some(url) => url.clone(),
        None => cfg.store.database_url().context("no database configured")?,
    };
    let store =
        SqliteTrackingStore::open(&url)?.with_insert_batch_size(cfg.store.insert_batch_size()?);
    Ok(store)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pipeline_tracker=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load(&cli)?;

    match &cli.cmd {
        Cmd::Migrate => {
            let mut store = open_store(&cli, &cfg)?;
            let applied = migrate::run_pending(store.connection())?;
            print_json(&serde_json::json!({ "applied_migrations": applied }))?;
        }
        Cmd::GapFill(args) => {
            let settings = settings(&cfg, &args.pipeline)?;
            let mut store = open_store(&cli, &cfg)?;
            let report = run_gap_fill(&mut store, &settings, args.now()?)?;
            print_json(&report)?;
        }
        Cmd::Next(args) => {
            let settings = settings(&cfg, &args.pipeline)?;
            let mut store = open_store(&cli, &cfg)?;
            let batch = get_next_n(&mut store, &settings, args.now()?)?;
            print_json(&batch)?;
        }
        Cmd::Bootstrap {
            pipeline,
            start,
            exact,
        } => {
            let settings = settings(&cfg, &pipeline.pipeline)?;
            let start = parse_rfc3339_utc(start).with_context(|| format!("--start {start}"))?;
            let start = if *exact {
                start.with_timezone(&settings.timezone)
            } else {
                bootstrap::aligned_start(&settings, &start)?
            };
            let mut store = open_store(&cli, &cfg)?;
            let created = bootstrap::bootstrap_first_window(&mut store, &settings, start)?;
            print_json(&created)?;
        }
        Cmd::Show {
            pipeline,
            status,
            limit,
            id,
        } => {
            let mut store = open_store(&cli, &cfg)?;
            if let Some(id) = id {
                print_json(&store.fetch_by_tracking_id(*id)?)?;
                return Ok(());
            }
            let status: PipelineStatus = status.parse()?;
            let filter = match pipeline {
                Some(key) => settings(&cfg, key)?.fetch_filter,
                None => RecordFilter::default(),
            };
            print_json(&store.fetch_by_status(status, &filter, *limit)?)?;
        }
    }

    Ok(())
}
