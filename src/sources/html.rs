use anyhow::{Result, anyhow};
use chrono::Utc;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::{SourceAdapter, SourceContext};
use crate::http::{Fetch, get_json};
use crate::jitter::Jitter;
use crate::matcher::Matcher;
use crate::models::{Job, SALARY_NOT_SPECIFIED};
use crate::parse::{
    clean_tracking_url, collapse_whitespace, description, extract_salary, html_to_text,
    title_case, truncate_chars,
};
use crate::pool::WorkerPool;

// --- Hacker News "Who is hiring" ---

const HN_SEARCH_URL: &str = "https://hn.algolia.com/api/v1/search_by_date";
const HN_ITEM_URL: &str = "https://hn.algolia.com/api/v1/items";
const HN_COMMENT_URL: &str = "https://news.ycombinator.com/item?id=";
const HN_MAX_COMMENTS: usize = 100;
const HN_COMPANY_LIMIT: usize = 50;
const HN_ROLE_PATTERN: &str =
    r"(devops|sre|infrastructure|platform|cloud)\s*(engineer|lead|manager)?";

#[derive(Debug, Deserialize)]
struct HnSearch {
    #[serde(default)]
    hits: Vec<HnHit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HnHit {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    object_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HnItem {
    #[serde(default)]
    children: Vec<HnComment>,
}

#[derive(Debug, Deserialize)]
struct HnComment {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    text: Option<String>,
}

/// Company is the first `|`-separated field of a comment's first line.
fn hn_company(comment_html: &str) -> String {
    let first_block = comment_html
        .split("<p>")
        .next()
        .unwrap_or(comment_html)
        .lines()
        .next()
        .unwrap_or("");
    let first_line = html_to_text(first_block);
    match first_line.split_once('|') {
        Some((company, _)) => truncate_chars(company.trim(), HN_COMPANY_LIMIT),
        None => "See posting".to_string(),
    }
}

pub struct HackerNewsAdapter {
    matcher: Matcher,
    fetch: Arc<dyn Fetch>,
    role: Option<Regex>,
}

impl HackerNewsAdapter {
    pub fn new(ctx: &SourceContext) -> Self {
        Self {
            matcher: ctx.matcher.clone(),
            fetch: Arc::clone(&ctx.fetch),
            role: Regex::new(HN_ROLE_PATTERN).ok(),
        }
    }

    fn latest_thread(&self) -> Result<String> {
        let search: HnSearch = get_json(
            self.fetch.as_ref(),
            HN_SEARCH_URL,
            &[("query", "who is hiring"), ("tags", "story"), ("hitsPerPage", "5")],
        )?;
        search
            .hits
            .into_iter()
            .find(|hit| {
                hit.title
                    .as_deref()
                    .is_some_and(|t| t.to_lowercase().contains("who is hiring"))
            })
            .and_then(|hit| hit.object_id)
            .ok_or_else(|| anyhow!("no 'Who is hiring' thread found"))
    }

    fn title_for(&self, text: &str) -> String {
        self.role
            .as_ref()
            .and_then(|re| re.find(&text.to_lowercase()).map(|m| title_case(m.as_str())))
            .unwrap_or_else(|| "DevOps Role".to_string())
    }

    fn comment_to_job(&self, comment: HnComment) -> Option<Job> {
        let id = comment.id?;
        let html = comment.text.filter(|t| !t.trim().is_empty())?;
        let text = html_to_text(&html);

        if !self.matcher.matches_keywords("", &text) {
            return None;
        }
        if !self.matcher.matches_location(&text, false) {
            return None;
        }

        let company = hn_company(&html);
        info!("Found HN: {}", company);
        Some(Job {
            title: self.title_for(&text),
            company,
            location: "Remote".to_string(),
            salary: extract_salary(&text),
            url: format!("{}{}", HN_COMMENT_URL, id),
            source: "HackerNews".to_string(),
            description: description(&text),
            remote: true,
            scraped_at: Utc::now(),
        })
    }

    fn collect(&self) -> Result<Vec<Job>> {
        let story_id = self.latest_thread()?;
        let item: HnItem = get_json(
            self.fetch.as_ref(),
            &format!("{}/{}", HN_ITEM_URL, story_id),
            &[],
        )?;
        Ok(item
            .children
            .into_iter()
            .take(HN_MAX_COMMENTS)
            .filter_map(|comment| self.comment_to_job(comment))
            .collect())
    }
}

impl SourceAdapter for HackerNewsAdapter {
    fn name(&self) -> &str {
        "HackerNews"
    }

    fn scrape(&self) -> Vec<Job> {
        info!("Scraping Hacker News Who's Hiring...");
        let jobs = self.collect().unwrap_or_else(|e| {
            debug!("HackerNews: {:#}", e);
            Vec::new()
        });
        info!("HackerNews: Found {} jobs", jobs.len());
        jobs
    }
}

// --- LinkedIn public search pages ---

const LINKEDIN_SEARCH_URL: &str = "https://www.linkedin.com/jobs/search/";
const LINKEDIN_CARDS_PER_PAGE: usize = 10;

/// Fixed public searches: (keywords, location, extra filter).
const LINKEDIN_SEARCHES: &[(&str, &str, (&str, &str))] = &[
    ("devops engineer", "United States", ("f_WT", "2")),
    ("sre engineer", "United States", ("f_WT", "2")),
    ("devops", "Canada", ("f_TPR", "r86400")),
];

#[derive(Debug, Clone)]
struct LinkedInSearch {
    keywords: &'static str,
    location: &'static str,
    filter: (&'static str, &'static str),
}

impl LinkedInSearch {
    fn query(&self) -> [(&str, &str); 3] {
        [
            ("keywords", self.keywords),
            ("location", self.location),
            self.filter,
        ]
    }
}

struct CardSelectors {
    card: Selector,
    title: Selector,
    company: Selector,
    location: Selector,
    link: Selector,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector '{}': {:?}", css, e))
}

impl CardSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            card: selector("div[class*='base-card'], div[class*='job-search-card']")?,
            title: selector("h3[class*='title'], span[class*='title']")?,
            company: selector(
                "h4[class*='company'], h4[class*='subtitle'], a[class*='company'], a[class*='subtitle']",
            )?,
            location: selector("span[class*='location']")?,
            link: selector("a[class*='base-card__full-link']")?,
        })
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

struct CardParser {
    matcher: Matcher,
    fetch: Arc<dyn Fetch>,
    selectors: CardSelectors,
    jitter: Jitter,
}

impl CardParser {
    fn first_text(&self, card: ElementRef<'_>, selector: &Selector) -> Option<String> {
        card.select(selector)
            .map(element_text)
            .find(|text| !text.is_empty())
    }

    fn parse_page(&self, page_url: &str, body: &str) -> Vec<Job> {
        let document = Html::parse_document(body);
        let mut jobs = Vec::new();

        for card in document
            .select(&self.selectors.card)
            .take(LINKEDIN_CARDS_PER_PAGE)
        {
            let Some(title) = self.first_text(card, &self.selectors.title) else {
                continue;
            };
            if !self.matcher.matches_keywords(&title, "") {
                continue;
            }

            let location = self
                .first_text(card, &self.selectors.location)
                .unwrap_or_else(|| "Remote".to_string());
            let remote = location.to_lowercase().contains("remote");
            if !self.matcher.matches_location(&location, remote) {
                continue;
            }

            let company = self
                .first_text(card, &self.selectors.company)
                .unwrap_or_else(|| "Unknown".to_string());
            let url = card
                .select(&self.selectors.link)
                .next()
                .and_then(|link| link.value().attr("href"))
                .and_then(clean_tracking_url)
                .unwrap_or_else(|| page_url.to_string());

            info!("Found LinkedIn: {} at {}", title, company);
            jobs.push(Job {
                title,
                company,
                location,
                salary: SALARY_NOT_SPECIFIED.to_string(),
                url,
                source: "LinkedIn".to_string(),
                description: description(&element_text(card)),
                remote,
                scraped_at: Utc::now(),
            });
        }
        jobs
    }

    fn scrape_search(&self, search: &LinkedInSearch) -> Result<Vec<Job>> {
        let result = self
            .fetch
            .get_text(LINKEDIN_SEARCH_URL, &search.query());
        self.jitter.pause();
        Ok(self.parse_page(LINKEDIN_SEARCH_URL, &result?))
    }
}

pub struct LinkedInAdapter {
    parser: Arc<CardParser>,
    pool: WorkerPool,
}

impl LinkedInAdapter {
    pub fn new(ctx: &SourceContext) -> Result<Self> {
        Ok(Self {
            parser: Arc::new(CardParser {
                matcher: ctx.matcher.clone(),
                fetch: Arc::clone(&ctx.fetch),
                selectors: CardSelectors::new()?,
                jitter: ctx.jitter(2.0, 4.0),
            }),
            pool: ctx.pool,
        })
    }
}

impl SourceAdapter for LinkedInAdapter {
    fn name(&self) -> &str {
        "LinkedIn"
    }

    fn scrape(&self) -> Vec<Job> {
        info!("Scraping LinkedIn...");
        let targets: Vec<(String, LinkedInSearch)> = LINKEDIN_SEARCHES
            .iter()
            .map(|&(keywords, location, filter)| {
                (
                    format!("{} / {}", keywords, location),
                    LinkedInSearch {
                        keywords,
                        location,
                        filter,
                    },
                )
            })
            .collect();

        let parser = Arc::clone(&self.parser);
        let jobs = self
            .pool
            .run("LinkedIn", targets, move |_, search| parser.scrape_search(&search));
        info!("LinkedIn: Found {} jobs", jobs.len());
        jobs
    }
}
