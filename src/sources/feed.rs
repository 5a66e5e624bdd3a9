use anyhow::Result;
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

use super::{SourceAdapter, SourceContext};
use crate::http::{Fetch, get_json};
use crate::jitter::Jitter;
use crate::matcher::Matcher;
use crate::models::{Job, SALARY_NOT_SPECIFIED};
use crate::parse::{description, html_to_text};
use crate::pool::WorkerPool;

const REMOTIVE_API_URL: &str = "https://remotive.com/api/remote-jobs";

/// Entries kept from each keyword query.
pub const RESULTS_PER_QUERY: usize = 30;

#[derive(Debug, Deserialize)]
struct RemotiveResponse {
    #[serde(default)]
    jobs: Vec<RemotiveJob>,
}

#[derive(Debug, Deserialize)]
struct RemotiveJob {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    company_name: Option<String>,
    #[serde(default)]
    candidate_required_location: Option<String>,
    #[serde(default)]
    salary: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

struct FeedQuery {
    matcher: Matcher,
    fetch: Arc<dyn Fetch>,
    jitter: Jitter,
}

impl FeedQuery {
    fn search(&self, keyword: &str) -> Result<Vec<Job>> {
        let limit = RESULTS_PER_QUERY.to_string();
        let result: Result<RemotiveResponse, _> = get_json(
            self.fetch.as_ref(),
            REMOTIVE_API_URL,
            &[("search", keyword), ("limit", limit.as_str())],
        );
        self.jitter.pause();

        let mut jobs = Vec::new();
        for entry in result?.jobs.into_iter().take(RESULTS_PER_QUERY) {
            let title = or_default(entry.title, "Unknown");
            let text = html_to_text(entry.description.as_deref().unwrap_or_default());
            if !self.matcher.matches_keywords(&title, &text) {
                continue;
            }

            let location = or_default(entry.candidate_required_location, "Worldwide");
            if !self
                .matcher
                .matches_location(&format!("{} {}", location, text), true)
            {
                continue;
            }

            let company = or_default(entry.company_name, "Unknown");
            info!("Found Remotive: {} at {}", title, company);
            jobs.push(Job {
                title,
                company,
                location,
                salary: or_default(entry.salary, SALARY_NOT_SPECIFIED),
                url: entry.url.unwrap_or_default(),
                source: "Remotive".to_string(),
                description: description(&text),
                remote: true,
                scraped_at: Utc::now(),
            });
        }
        Ok(jobs)
    }
}

/// Remotive search API: one query per keyword, merged by URL.
pub struct FeedAdapter {
    query: Arc<FeedQuery>,
    pool: WorkerPool,
}

impl FeedAdapter {
    pub fn new(ctx: &SourceContext) -> Self {
        Self {
            query: Arc::new(FeedQuery {
                matcher: ctx.matcher.clone(),
                fetch: Arc::clone(&ctx.fetch),
                jitter: ctx.jitter(0.5, 1.0),
            }),
            pool: ctx.pool,
        }
    }
}

impl SourceAdapter for FeedAdapter {
    fn name(&self) -> &str {
        "Remotive"
    }

    fn scrape(&self) -> Vec<Job> {
        info!("Scraping Remotive...");
        let targets: Vec<(String, ())> = self
            .query
            .matcher
            .keywords()
            .iter()
            .map(|kw| (kw.clone(), ()))
            .collect();

        let query = Arc::clone(&self.query);
        let found = self
            .pool
            .run("Remotive", targets, move |keyword, _| query.search(keyword));

        let mut seen = HashSet::new();
        let jobs: Vec<Job> = found
            .into_iter()
            .filter(|job| job.url.is_empty() || seen.insert(job.url.clone()))
            .collect();

        info!("Remotive: Found {} jobs", jobs.len());
        jobs
    }
}
