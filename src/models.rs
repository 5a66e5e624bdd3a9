use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel used when a posting carries no salary information.
pub const SALARY_NOT_SPECIFIED: &str = "Not specified";

/// Maximum number of characters kept from a posting description.
pub const DESCRIPTION_LIMIT: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    pub url: String,
    pub source: String, // "Remotive", "Greenhouse-Acme", ...
    pub description: String,
    pub remote: bool,
    pub scraped_at: DateTime<Utc>,
}

impl Job {
    /// Normalized `(title, company)` pair used for deduplication.
    pub fn identity_key(&self) -> (String, String) {
        (
            self.title.trim().to_lowercase(),
            self.company.trim().to_lowercase(),
        )
    }

    /// Provider part of `source`, i.e. the text before the first `-`.
    pub fn provider(&self) -> &str {
        self.source.split('-').next().unwrap_or(&self.source)
    }
}

/// Company display name -> provider board id.
pub type Boards = BTreeMap<String, String>;

/// Provider name -> boards for that provider.
pub type CompanyRegistry = BTreeMap<String, Boards>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationFilter {
    #[serde(default)]
    pub allowed: Vec<String>,
    #[serde(default)]
    pub excluded: Vec<String>,
}

/// Shared, read-only settings handed to every adapter for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub parallel: bool,
    pub max_workers: usize,
    pub keywords: Vec<String>,
    pub allowed_locations: Vec<String>,
    pub excluded_locations: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max_workers: 10,
            keywords: Vec::new(),
            allowed_locations: Vec::new(),
            excluded_locations: Vec::new(),
        }
    }
}

#[cfg(test)]
pub fn sample_job(title: &str, company: &str, source: &str) -> Job {
    Job {
        title: title.to_string(),
        company: company.to_string(),
        location: "Remote".to_string(),
        salary: SALARY_NOT_SPECIFIED.to_string(),
        url: format!("https://jobs.example.com/{}", title.replace(' ', "-")),
        source: source.to_string(),
        description: String::new(),
        remote: true,
        scraped_at: Utc::now(),
    }
}
