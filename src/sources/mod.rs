mod board;
mod feed;
mod html;

use anyhow::{Result, anyhow};
use std::fmt;
use std::sync::Arc;

use crate::http::Fetch;
use crate::jitter::Jitter;
use crate::matcher::Matcher;
use crate::models::{CompanyRegistry, Job, RunConfig};
use crate::pool::WorkerPool;

pub use board::{BoardAdapter, BoardKind};
pub use feed::FeedAdapter;
pub use html::{HackerNewsAdapter, LinkedInAdapter};

// --- Adapter trait ---

/// One job source. `scrape` never fails: unreachable targets and bad payloads
/// are logged and contribute nothing.
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;
    fn scrape(&self) -> Vec<Job>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Provider {
    Greenhouse,
    Lever,
    Ashby,
    Remotive,
    HackerNews,
    LinkedIn,
}

impl Provider {
    pub const ALL: [Provider; 6] = [
        Provider::Greenhouse,
        Provider::Lever,
        Provider::Ashby,
        Provider::Remotive,
        Provider::HackerNews,
        Provider::LinkedIn,
    ];

    /// Display name, also used as the `source` prefix of emitted jobs.
    pub fn label(&self) -> &'static str {
        match self {
            Provider::Greenhouse => "Greenhouse",
            Provider::Lever => "Lever",
            Provider::Ashby => "Ashby",
            Provider::Remotive => "Remotive",
            Provider::HackerNews => "HackerNews",
            Provider::LinkedIn => "LinkedIn",
        }
    }

    /// Key used in company registry files.
    pub fn key(&self) -> &'static str {
        match self {
            Provider::Greenhouse => "greenhouse",
            Provider::Lever => "lever",
            Provider::Ashby => "ashby",
            Provider::Remotive => "remotive",
            Provider::HackerNews => "hackernews",
            Provider::LinkedIn => "linkedin",
        }
    }

    pub fn board_kind(&self) -> Option<BoardKind> {
        match self {
            Provider::Greenhouse => Some(BoardKind::Greenhouse),
            Provider::Lever => Some(BoardKind::Lever),
            Provider::Ashby => Some(BoardKind::Ashby),
            _ => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn resolve_provider(name: &str) -> Result<Provider> {
    let wanted = name.trim().to_lowercase();
    Provider::ALL
        .into_iter()
        .find(|p| p.key() == wanted)
        .ok_or_else(|| {
            anyhow!(
                "Unknown provider '{}'. Available: greenhouse, lever, ashby, remotive, hackernews, linkedin",
                name
            )
        })
}

// --- Construction ---

/// Everything an adapter is built from for one run.
#[derive(Clone)]
pub struct SourceContext {
    pub config: RunConfig,
    pub matcher: Matcher,
    pub fetch: Arc<dyn Fetch>,
    pub pool: WorkerPool,
    pub polite: bool,
}

impl SourceContext {
    pub fn new(config: RunConfig, fetch: Arc<dyn Fetch>) -> Self {
        Self {
            matcher: Matcher::from_config(&config),
            pool: WorkerPool::from_config(&config),
            config,
            fetch,
            polite: true,
        }
    }

    /// Turns off inter-request delays.
    pub fn without_jitter(mut self) -> Self {
        self.polite = false;
        self
    }

    pub fn jitter(&self, min_secs: f64, max_secs: f64) -> Jitter {
        if self.polite {
            Jitter::new(self.config.parallel, min_secs, max_secs)
        } else {
            Jitter::disabled()
        }
    }
}

pub fn create_adapter(
    provider: Provider,
    ctx: &SourceContext,
    registry: &CompanyRegistry,
) -> Result<Box<dyn SourceAdapter>> {
    if let Some(kind) = provider.board_kind() {
        let boards = registry.get(provider.key()).cloned().unwrap_or_default();
        return Ok(Box::new(BoardAdapter::new(kind, ctx, boards)));
    }
    match provider {
        Provider::Remotive => Ok(Box::new(FeedAdapter::new(ctx))),
        Provider::HackerNews => Ok(Box::new(HackerNewsAdapter::new(ctx))),
        Provider::LinkedIn => Ok(Box::new(LinkedInAdapter::new(ctx)?)),
        _ => Err(anyhow!("No adapter for provider {}", provider)),
    }
}
