use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{error, info};

use crate::dedupe::{dedupe, dedupe_batch};
use crate::http::Fetch;
use crate::models::{CompanyRegistry, Job, RunConfig};
use crate::registry::merge_registries;
use crate::sources::{Provider, SourceContext, create_adapter};

/// Which providers a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Mode {
    /// API sources only
    #[default]
    Quick,
    /// API sources plus Ashby and LinkedIn
    Full,
}

impl Mode {
    pub fn providers(&self) -> Vec<Provider> {
        let mut providers = vec![
            Provider::Remotive,
            Provider::Greenhouse,
            Provider::Lever,
            Provider::HackerNews,
        ];
        if *self == Mode::Full {
            providers.extend([Provider::Ashby, Provider::LinkedIn]);
        }
        providers
    }
}

#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Persisted jobs followed by new ones, one per identity.
    pub jobs: Vec<Job>,
    /// Jobs produced this run before merging with the persisted set.
    pub scraped: usize,
    pub failed: Vec<String>,
}

/// Runs every configured adapter and merges their output with the persisted set.
pub struct Aggregator {
    config: RunConfig,
    fetch: Arc<dyn Fetch>,
    providers: Vec<Provider>,
    curated: CompanyRegistry,
    discovered: CompanyRegistry,
    polite: bool,
}

impl Aggregator {
    pub fn new(config: RunConfig, fetch: Arc<dyn Fetch>) -> Self {
        Self {
            config,
            fetch,
            providers: Mode::default().providers(),
            curated: CompanyRegistry::new(),
            discovered: CompanyRegistry::new(),
            polite: true,
        }
    }

    pub fn with_providers(mut self, providers: Vec<Provider>) -> Self {
        self.providers = providers;
        self
    }

    pub fn with_registries(
        mut self,
        curated: CompanyRegistry,
        discovered: CompanyRegistry,
    ) -> Self {
        self.curated = curated;
        self.discovered = discovered;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.polite = false;
        self
    }

    pub fn run(&self, persisted: Vec<Job>) -> RunOutcome {
        let registry = merge_registries(&self.curated, &self.discovered);
        let mut ctx = SourceContext::new(self.config.clone(), Arc::clone(&self.fetch));
        if !self.polite {
            ctx = ctx.without_jitter();
        }

        info!(
            "Running {} sources (parallel: {}, up to {} workers each)",
            self.providers.len(),
            self.config.parallel,
            ctx.pool.max_workers()
        );

        let mut scraped = Vec::new();
        let mut failed = Vec::new();
        for provider in &self.providers {
            info!("Running {}...", provider);
            match run_provider(*provider, &ctx, &registry) {
                Some(jobs) => {
                    info!("{}: Found {} jobs", provider, jobs.len());
                    scraped.extend(jobs);
                }
                None => failed.push(provider.label().to_string()),
            }
        }

        let unique = dedupe_batch(scraped);
        info!("Total unique jobs: {}", unique.len());
        let scraped = unique.len();

        RunOutcome {
            jobs: dedupe(persisted, unique),
            scraped,
            failed,
        }
    }
}

/// `None` when the adapter could not be built or blew up mid-scrape.
fn run_provider(
    provider: Provider,
    ctx: &SourceContext,
    registry: &CompanyRegistry,
) -> Option<Vec<Job>> {
    let adapter = match create_adapter(provider, ctx, registry) {
        Ok(adapter) => adapter,
        Err(e) => {
            error!("Error creating {}: {:#}", provider, e);
            return None;
        }
    };
    match catch_unwind(AssertUnwindSafe(|| adapter.scrape())) {
        Ok(jobs) => Some(jobs),
        Err(_) => {
            error!("Error running {}: scraper panicked", provider);
            None
        }
    }
}

/// Job counts per provider, keyed by the `source` prefix.
pub fn summarize(jobs: &[Job]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for job in jobs {
        *counts.entry(job.provider().to_string()).or_insert(0) += 1;
    }
    counts
}
