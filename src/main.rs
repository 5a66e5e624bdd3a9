mod aggregator;
mod config;
mod dedupe;
mod http;
mod jitter;
mod matcher;
mod models;
mod parse;
mod pool;
mod registry;
mod sources;
mod status;
mod store;

use aggregator::{Aggregator, Mode, summarize};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{DataDir, clean_keywords};
use http::HttpClient;
use models::{Job, RunConfig};
use pool::DEFAULT_MAX_WORKERS;
use sources::Provider;
use status::StatusBoard;
use std::path::PathBuf;
use std::sync::Arc;
use store::JobStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jobscout")]
#[command(about = "Aggregate job postings from ATS boards, feeds and job pages")]
struct Cli {
    /// Data directory (defaults to $JOBSCOUT_DATA_DIR or the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape all sources and merge the results into the job file
    Scrape {
        /// Which sources to run
        #[arg(short, long, value_enum, default_value_t = Mode::Quick)]
        mode: Mode,

        /// Run targets one at a time
        #[arg(long)]
        sequential: bool,

        /// Number of parallel workers per source
        #[arg(short, long, default_value_t = DEFAULT_MAX_WORKERS)]
        workers: usize,

        /// Run only these providers (repeatable, overrides --mode)
        #[arg(short, long = "provider")]
        providers: Vec<String>,

        /// Keyword to match (repeatable, overrides keywords.json)
        #[arg(short, long = "keyword")]
        keywords: Vec<String>,

        /// Job file to merge into
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List stored jobs
    List {
        /// Filter by provider (Greenhouse, Lever, Remotive, ...)
        #[arg(short, long)]
        source: Option<String>,

        /// Number of jobs to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show job counts per source
    Summary,

    /// Show effective company boards per provider
    Companies,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let data = match &cli.data_dir {
        Some(dir) => DataDir::new(dir),
        None => DataDir::locate(),
    };
    data.ensure_exists()?;

    match cli.command {
        Commands::Scrape {
            mode,
            providers,
            sequential,
            workers,
            keywords,
            output,
        } => {
            let providers = if providers.is_empty() {
                mode.providers()
            } else {
                providers
                    .iter()
                    .map(|name| sources::resolve_provider(name))
                    .collect::<Result<Vec<_>>>()?
            };
            let store = JobStore::open(output.unwrap_or_else(|| data.jobs_path()))?;
            let status = StatusBoard::new();
            status.begin("Scraping jobs...")?;

            let result = scrape(&data, &store, providers, !sequential, workers, &keywords);
            status.finish(result.as_ref().map(Vec::len));
            let jobs = result?;

            print_summary(&jobs);
            println!("{}", status.reader().snapshot().message);
        }

        Commands::List { source, limit } => {
            let store = JobStore::open(data.jobs_path())?;
            let jobs: Vec<Job> = store
                .load()
                .into_iter()
                .filter(|job| match &source {
                    Some(s) => job.provider().eq_ignore_ascii_case(s),
                    None => true,
                })
                .take(limit)
                .collect();

            if jobs.is_empty() {
                println!("No jobs found.");
            } else {
                println!(
                    "{:<30} {:<20} {:<20} {:<14} {:<12}",
                    "TITLE", "COMPANY", "LOCATION", "SALARY", "SOURCE"
                );
                println!("{}", "-".repeat(100));
                for job in jobs {
                    println!(
                        "{:<30} {:<20} {:<20} {:<14} {:<12}",
                        truncate(&job.title, 28),
                        truncate(&job.company, 18),
                        truncate(&job.location, 18),
                        truncate(&job.salary, 12),
                        job.provider()
                    );
                }
            }
        }

        Commands::Summary => {
            let store = JobStore::open(data.jobs_path())?;
            print_summary(&store.load());
        }

        Commands::Companies => {
            let registry = registry::merge_registries(
                &data.curated_companies(),
                &data.discovered_companies(),
            );
            println!("{:<12} {:>8}", "PROVIDER", "BOARDS");
            println!("{}", "-".repeat(21));
            for provider in Provider::ALL {
                if provider.board_kind().is_none() {
                    continue;
                }
                let count = registry::boards_for(&registry, provider.key()).map_or(0, |b| b.len());
                println!("{:<12} {:>8}", provider.label(), count);
            }
        }
    }

    Ok(())
}

fn scrape(
    data: &DataDir,
    store: &JobStore,
    providers: Vec<Provider>,
    parallel: bool,
    workers: usize,
    keywords: &[String],
) -> Result<Vec<Job>> {
    let keywords = if keywords.is_empty() {
        data.keywords()
    } else {
        clean_keywords(keywords)
    };
    let locations = data.locations();

    info!("Data directory: {}", data.root().display());
    info!("Keywords: {:?}", keywords);
    info!("Allowed locations: {} terms", locations.allowed.len());

    let config = RunConfig {
        parallel,
        max_workers: workers,
        keywords,
        allowed_locations: locations.allowed,
        excluded_locations: locations.excluded,
    };
    let fetch = Arc::new(HttpClient::new()?);
    let aggregator = Aggregator::new(config, fetch)
        .with_providers(providers)
        .with_registries(data.curated_companies(), data.discovered_companies());

    let outcome = aggregator.run(store.load());
    info!("Scraped {} unique jobs this run", outcome.scraped);
    if !outcome.failed.is_empty() {
        info!("Failed sources: {}", outcome.failed.join(", "));
    }
    store
        .save_merged(outcome.jobs)
        .with_context(|| format!("Failed to save jobs to {}", store.path().display()))
}

fn print_summary(jobs: &[Job]) {
    println!("\n{}", "=".repeat(60));
    println!("FOUND {} MATCHING JOBS", jobs.len());
    println!("{}", "=".repeat(60));
    for (source, count) in summarize(jobs) {
        println!("{:<20} {:>6} jobs", source, count);
    }
    println!("{}", "=".repeat(60));
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max.saturating_sub(3)).collect::<String>())
    }
}
