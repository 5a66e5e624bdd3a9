use anyhow::Result;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::{SourceAdapter, SourceContext};
use crate::http::{Fetch, get_json};
use crate::jitter::Jitter;
use crate::matcher::Matcher;
use crate::models::{Boards, Job, SALARY_NOT_SPECIFIED};
use crate::parse::description;
use crate::pool::WorkerPool;

const GREENHOUSE_API_URL: &str = "https://boards-api.greenhouse.io/v1/boards";
const LEVER_API_URL: &str = "https://api.lever.co/v0/postings";
const ASHBY_API_URL: &str = "https://api.ashbyhq.com/posting-api/job-board";

const DEFAULT_LOCATION: &str = "Remote";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardKind {
    Greenhouse,
    Lever,
    Ashby,
}

impl BoardKind {
    pub fn label(&self) -> &'static str {
        match self {
            BoardKind::Greenhouse => "Greenhouse",
            BoardKind::Lever => "Lever",
            BoardKind::Ashby => "Ashby",
        }
    }

    pub fn board_url(&self, board_id: &str) -> String {
        match self {
            BoardKind::Greenhouse => format!("{}/{}/jobs", GREENHOUSE_API_URL, board_id),
            BoardKind::Lever => format!("{}/{}", LEVER_API_URL, board_id),
            BoardKind::Ashby => format!("{}/{}", ASHBY_API_URL, board_id),
        }
    }
}

// --- Provider payloads ---

#[derive(Debug, Deserialize)]
struct NamedLocation {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GreenhouseBoard {
    #[serde(default)]
    jobs: Vec<GreenhouseJob>,
}

#[derive(Debug, Deserialize)]
struct GreenhouseJob {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    location: Option<NamedLocation>,
    #[serde(default)]
    absolute_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeverPosting {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    categories: Option<LeverCategories>,
    #[serde(default)]
    hosted_url: Option<String>,
    #[serde(default)]
    description_plain: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LeverCategories {
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AshbyBoard {
    #[serde(default)]
    jobs: Vec<AshbyJob>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AshbyJob {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    location: Option<AshbyLocation>,
    #[serde(default)]
    job_url: Option<String>,
    #[serde(default)]
    apply_url: Option<String>,
    #[serde(default)]
    description_plain: Option<String>,
    #[serde(default)]
    is_remote: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AshbyLocation {
    Text(String),
    Named(NamedLocation),
}

/// Provider-neutral view of one posting on a board.
#[derive(Debug, Default)]
struct Posting {
    title: String,
    location: Option<String>,
    url: String,
    description: String,
    remote: bool,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_board(kind: BoardKind, fetch: &dyn Fetch, url: &str) -> Result<Vec<Posting>> {
    let postings = match kind {
        BoardKind::Greenhouse => {
            let board: GreenhouseBoard = get_json(fetch, url, &[])?;
            board
                .jobs
                .into_iter()
                .map(|job| Posting {
                    title: job.title.unwrap_or_default(),
                    location: non_empty(job.location.and_then(|l| l.name)),
                    url: job.absolute_url.unwrap_or_default(),
                    ..Default::default()
                })
                .collect()
        }
        BoardKind::Lever => {
            let postings: Vec<LeverPosting> = get_json(fetch, url, &[])?;
            postings
                .into_iter()
                .map(|job| Posting {
                    title: job.text.unwrap_or_default(),
                    location: non_empty(job.categories.and_then(|c| c.location)),
                    url: job.hosted_url.unwrap_or_default(),
                    description: job.description_plain.unwrap_or_default(),
                    remote: false,
                })
                .collect()
        }
        BoardKind::Ashby => {
            let board: AshbyBoard = get_json(fetch, url, &[])?;
            board
                .jobs
                .into_iter()
                .map(|job| {
                    let location = match job.location {
                        Some(AshbyLocation::Text(text)) => non_empty(Some(text)),
                        Some(AshbyLocation::Named(named)) => non_empty(named.name),
                        None => None,
                    };
                    Posting {
                        title: job.title.unwrap_or_default(),
                        location,
                        url: non_empty(job.job_url)
                            .or_else(|| non_empty(job.apply_url))
                            .unwrap_or_default(),
                        description: job.description_plain.unwrap_or_default(),
                        remote: job.is_remote.unwrap_or(false),
                    }
                })
                .collect()
        }
    };
    Ok(postings)
}

// --- Adapter ---

struct BoardScraper {
    kind: BoardKind,
    matcher: Matcher,
    fetch: Arc<dyn Fetch>,
    jitter: Jitter,
}

impl BoardScraper {
    fn scrape_board(&self, company: &str, board_id: &str) -> Result<Vec<Job>> {
        let url = self.kind.board_url(board_id);
        let result = parse_board(self.kind, self.fetch.as_ref(), &url);
        self.jitter.pause();

        let mut jobs = Vec::new();
        for posting in result? {
            if !self.matcher.matches_keywords(&posting.title, "") {
                continue;
            }

            let location = posting
                .location
                .unwrap_or_else(|| DEFAULT_LOCATION.to_string());
            let remote = posting.remote || location.to_lowercase().contains("remote");
            if !self.matcher.matches_location(&location, remote) {
                continue;
            }

            info!("Found {} {}: {}", self.kind.label(), company, posting.title);
            jobs.push(Job {
                title: posting.title,
                company: company.to_string(),
                location,
                salary: SALARY_NOT_SPECIFIED.to_string(),
                url: posting.url,
                source: format!("{}-{}", self.kind.label(), company),
                description: description(&posting.description),
                remote,
                scraped_at: Utc::now(),
            });
        }
        Ok(jobs)
    }
}

/// Greenhouse / Lever / Ashby: one JSON GET per company board.
pub struct BoardAdapter {
    scraper: Arc<BoardScraper>,
    boards: Boards,
    pool: WorkerPool,
}

impl BoardAdapter {
    pub fn new(kind: BoardKind, ctx: &SourceContext, boards: Boards) -> Self {
        Self {
            scraper: Arc::new(BoardScraper {
                kind,
                matcher: ctx.matcher.clone(),
                fetch: Arc::clone(&ctx.fetch),
                jitter: ctx.jitter(0.5, 1.0),
            }),
            boards,
            pool: ctx.pool,
        }
    }
}

impl SourceAdapter for BoardAdapter {
    fn name(&self) -> &str {
        self.scraper.kind.label()
    }

    fn scrape(&self) -> Vec<Job> {
        let label = self.scraper.kind.label();
        info!("Scraping {} {} boards...", self.boards.len(), label);

        let targets: Vec<(String, String)> = self
            .boards
            .iter()
            .map(|(company, board_id)| (company.clone(), board_id.clone()))
            .collect();
        let scraper = Arc::clone(&self.scraper);
        let jobs = self
            .pool
            .run(label, targets, move |company, board_id| {
                scraper.scrape_board(company, &board_id)
            });

        info!("{}: Found {} jobs", label, jobs.len());
        jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::fake::FakeFetch;
    use crate::models::RunConfig;

    const GREENHOUSE_ACME: &str = r#"{
        "jobs": [
            {"title": "DevOps Engineer", "location": {"name": "New York, USA"},
             "absolute_url": "https://boards.greenhouse.io/acme/jobs/1"},
            {"title": "Barista", "location": {"name": "Denver, USA"},
             "absolute_url": "https://boards.greenhouse.io/acme/jobs/2"}
        ]
    }"#;

    fn context(
        keywords: &[&str],
        allowed: &[&str],
        excluded: &[&str],
        fetch: FakeFetch,
    ) -> SourceContext {
        let config = RunConfig {
            parallel: true,
            max_workers: 4,
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            allowed_locations: allowed.iter().map(|s| s.to_string()).collect(),
            excluded_locations: excluded.iter().map(|s| s.to_string()).collect(),
        };
        SourceContext::new(config, Arc::new(fetch)).without_jitter()
    }

    fn boards(entries: &[(&str, &str)]) -> Boards {
        entries
            .iter()
            .map(|(name, id)| (name.to_string(), id.to_string()))
            .collect()
    }

    #[test]
    fn test_greenhouse_filters_by_keyword_and_location() {
        let fetch = FakeFetch::new().ok(
            "https://boards-api.greenhouse.io/v1/boards/acme/jobs",
            GREENHOUSE_ACME,
        );
        let ctx = context(&["devops"], &["remote", "usa"], &[], fetch);
        let adapter = BoardAdapter::new(BoardKind::Greenhouse, &ctx, boards(&[("Acme", "acme")]));

        let jobs = adapter.scrape();
        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert_eq!(job.title, "DevOps Engineer");
        assert_eq!(job.company, "Acme");
        assert_eq!(job.source, "Greenhouse-Acme");
        assert_eq!(job.salary, "Not specified");
        assert_eq!(job.url, "https://boards.greenhouse.io/acme/jobs/1");
        assert!(!job.remote);
    }

    #[test]
    fn test_failed_board_is_isolated() {
        let ok_board = r#"{"jobs": [{"title": "SRE", "location": {"name": "Remote"}, "absolute_url": "u"}]}"#;
        let fetch = FakeFetch::new()
            .ok("https://boards-api.greenhouse.io/v1/boards/acme/jobs", ok_board)
            .status("https://boards-api.greenhouse.io/v1/boards/broken/jobs", 500)
            .ok("https://boards-api.greenhouse.io/v1/boards/globex/jobs", ok_board);
        let ctx = context(&["sre"], &["remote"], &[], fetch);
        let adapter = BoardAdapter::new(
            BoardKind::Greenhouse,
            &ctx,
            boards(&[("Acme", "acme"), ("Broken", "broken"), ("Globex", "globex")]),
        );

        let mut companies: Vec<_> = adapter.scrape().into_iter().map(|j| j.company).collect();
        companies.sort();
        assert_eq!(companies, vec!["Acme", "Globex"]);
    }

    #[test]
    fn test_null_fields_do_not_drop_the_board() {
        let body = r#"{"jobs": [
            {"title": "DevOps Engineer", "location": {"name": "Remote"},
             "absolute_url": "https://boards.greenhouse.io/acme/jobs/1"},
            {"title": "SRE", "location": null, "absolute_url": null},
            {"title": null, "location": {"name": "Remote"}, "absolute_url": "u"}
        ]}"#;
        let fetch =
            FakeFetch::new().ok("https://boards-api.greenhouse.io/v1/boards/acme/jobs", body);
        let ctx = context(&["devops", "sre"], &["remote"], &[], fetch);
        let adapter = BoardAdapter::new(BoardKind::Greenhouse, &ctx, boards(&[("Acme", "acme")]));

        let mut jobs = adapter.scrape();
        jobs.sort_by(|a, b| a.title.cmp(&b.title));
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].title, "DevOps Engineer");
        assert_eq!(jobs[1].title, "SRE");
        assert_eq!(jobs[1].location, "Remote");
        assert_eq!(jobs[1].url, "");
    }

    #[test]
    fn test_lever_null_text_and_url() {
        let body = r#"[
            {"text": null, "categories": {"location": "Remote"}, "hostedUrl": null},
            {"text": "SRE", "categories": {"location": "Remote"}, "hostedUrl": "https://jobs.lever.co/acme/1"}
        ]"#;
        let fetch = FakeFetch::new().ok("https://api.lever.co/v0/postings/acme", body);
        let ctx = context(&["sre"], &["remote"], &[], fetch);
        let adapter = BoardAdapter::new(BoardKind::Lever, &ctx, boards(&[("Acme", "acme")]));

        let jobs = adapter.scrape();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].url, "https://jobs.lever.co/acme/1");
    }

    #[test]
    fn test_malformed_payload_yields_nothing() {
        let fetch =
            FakeFetch::new().ok("https://api.lever.co/v0/postings/acme", "<html>oops</html>");
        let ctx = context(&["sre"], &[], &[], fetch);
        let adapter = BoardAdapter::new(BoardKind::Lever, &ctx, boards(&[("Acme", "acme")]));
        assert!(adapter.scrape().is_empty());
    }

    #[test]
    fn test_lever_posting_translation() {
        let body = format!(
            r#"[
                {{"text": "Site Reliability Engineer", "categories": {{"location": "Remote - US"}},
                  "hostedUrl": "https://jobs.lever.co/acme/1", "descriptionPlain": "{}"}},
                {{"text": "Platform Engineer", "categories": {{}},
                  "hostedUrl": "https://jobs.lever.co/acme/2"}}
            ]"#,
            "x".repeat(800)
        );
        let fetch = FakeFetch::new().ok("https://api.lever.co/v0/postings/acme", &body);
        let ctx = context(&["site reliability", "platform"], &["remote"], &[], fetch);
        let adapter = BoardAdapter::new(BoardKind::Lever, &ctx, boards(&[("Acme", "acme")]));

        let jobs = adapter.scrape();
        assert_eq!(jobs.len(), 2);
        let sre = jobs.iter().find(|j| j.title == "Site Reliability Engineer").unwrap();
        assert_eq!(sre.location, "Remote - US");
        assert_eq!(sre.description.chars().count(), 500);
        assert!(sre.remote);
        assert_eq!(sre.source, "Lever-Acme");

        let platform = jobs.iter().find(|j| j.title == "Platform Engineer").unwrap();
        assert_eq!(platform.location, "Remote");
        assert_eq!(platform.description, "");
    }

    #[test]
    fn test_ashby_location_shapes_and_url_fallback() {
        let body = r#"{"jobs": [
            {"title": "DevOps Engineer", "location": "Toronto, Canada", "jobUrl": "https://jobs.ashbyhq.com/acme/1"},
            {"title": "Cloud Engineer", "location": {"name": "Austin, USA"}, "applyUrl": "https://jobs.ashbyhq.com/acme/2/apply"},
            {"title": "Infrastructure Engineer", "location": "London, UK", "jobUrl": "https://jobs.ashbyhq.com/acme/3"},
            {"title": "Kubernetes Admin", "location": "Berlin", "isRemote": true, "jobUrl": "https://jobs.ashbyhq.com/acme/4"}
        ]}"#;
        let fetch = FakeFetch::new().ok("https://api.ashbyhq.com/posting-api/job-board/acme", body);
        let ctx = context(&[], &["canada", "usa", "remote"], &["london"], fetch);
        let adapter = BoardAdapter::new(BoardKind::Ashby, &ctx, boards(&[("Acme", "acme")]));

        let mut jobs = adapter.scrape();
        jobs.sort_by(|a, b| a.title.cmp(&b.title));
        let titles: Vec<_> = jobs.iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["Cloud Engineer", "DevOps Engineer", "Kubernetes Admin"]);
        assert_eq!(jobs[0].url, "https://jobs.ashbyhq.com/acme/2/apply");
        assert_eq!(jobs[0].location, "Austin, USA");
        assert!(jobs[2].remote);
    }

    #[test]
    fn test_empty_registry_makes_no_requests() {
        let fetch = Arc::new(FakeFetch::new());
        let config = RunConfig::default();
        let ctx = SourceContext::new(config, fetch.clone()).without_jitter();
        let adapter = BoardAdapter::new(BoardKind::Lever, &ctx, Boards::new());
        assert!(adapter.scrape().is_empty());
        assert_eq!(fetch.request_count(), 0);
    }
}
