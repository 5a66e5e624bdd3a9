use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::matcher::DEFAULT_KEYWORDS;
use crate::models::{Boards, CompanyRegistry, LocationFilter};

pub const DATA_DIR_ENV: &str = "JOBSCOUT_DATA_DIR";

const COMPANIES_FILE: &str = "companies.json";
const DISCOVERED_FILE: &str = "discovered_companies.json";
const KEYWORDS_FILE: &str = "keywords.json";
const LOCATIONS_FILE: &str = "locations.json";
const JOBS_FILE: &str = "jobs.json";

const DEFAULT_ALLOWED: &[&str] = &[
    "united states",
    "usa",
    "u.s.",
    "america",
    "canada",
    "canadian",
    "toronto",
    "vancouver",
    "montreal",
    "ontario",
    "british columbia",
    "california",
    "new york",
    "texas",
    "washington",
    "colorado",
    "san francisco",
    "seattle",
    "austin",
    "denver",
    "boston",
    "chicago",
    "remote",
    "north america",
    "worldwide",
    "anywhere",
    "global",
];

const DEFAULT_EXCLUDED: &[&str] = &[
    "europe only",
    "eu only",
    "uk only",
    "emea only",
    "apac only",
    "india only",
    "australia only",
    "vienna",
    "berlin",
    "london",
    "paris",
    "amsterdam",
    "dublin",
    "singapore",
    "tokyo",
    "sydney",
];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn default_locations() -> LocationFilter {
    LocationFilter {
        allowed: strings(DEFAULT_ALLOWED),
        excluded: strings(DEFAULT_EXCLUDED),
    }
}

pub fn default_keywords() -> Vec<String> {
    strings(DEFAULT_KEYWORDS)
}

/// Trims keywords and drops blank entries.
pub fn clean_keywords(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Reads the JSON configuration files of one data directory.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$JOBSCOUT_DATA_DIR`, else the platform data dir, else `./data`.
    pub fn locate() -> Self {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                return Self::new(dir);
            }
        }
        match directories::ProjectDirs::from("", "", "jobscout") {
            Some(proj_dirs) => Self::new(proj_dirs.data_dir()),
            None => Self::new("data"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn jobs_path(&self) -> PathBuf {
        self.root.join(JOBS_FILE)
    }

    pub fn ensure_exists(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create data directory: {}", self.root.display()))
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let path = self.root.join(name);
        if !path.exists() {
            return None;
        }
        match read_json(&path) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring {}: {:#}", path.display(), e);
                None
            }
        }
    }

    /// Curated boards from `companies.json` (`{provider: {"companies": {name: id}}}`).
    pub fn curated_companies(&self) -> CompanyRegistry {
        let Some(Value::Object(root)) = self.read::<Value>(COMPANIES_FILE) else {
            return CompanyRegistry::new();
        };
        root.iter()
            .filter_map(|(provider, section)| {
                section
                    .get("companies")
                    .map(|companies| (provider.to_lowercase(), boards_from(companies)))
            })
            .collect()
    }

    /// Discovery output (`{provider: {name: id}, "last_updated": ..}`).
    pub fn discovered_companies(&self) -> CompanyRegistry {
        let Some(Value::Object(root)) = self.read::<Value>(DISCOVERED_FILE) else {
            return CompanyRegistry::new();
        };
        root.iter()
            .filter(|(_, section)| section.is_object())
            .map(|(provider, section)| (provider.to_lowercase(), boards_from(section)))
            .collect()
    }

    pub fn keywords(&self) -> Vec<String> {
        match self.read::<Vec<String>>(KEYWORDS_FILE) {
            Some(keywords) => clean_keywords(&keywords),
            None => default_keywords(),
        }
    }

    /// `locations.json`, then the `locations` block of `companies.json`, then defaults.
    pub fn locations(&self) -> LocationFilter {
        if let Some(filter) = self.read::<LocationFilter>(LOCATIONS_FILE) {
            return filter;
        }
        self.read::<Value>(COMPANIES_FILE)
            .and_then(|root| root.get("locations").cloned())
            .and_then(|locations| serde_json::from_value(locations).ok())
            .unwrap_or_else(default_locations)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Malformed JSON in {}", path.display()))
}

fn boards_from(value: &Value) -> Boards {
    value
        .as_object()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|(name, id)| id.as_str().map(|id| (name.clone(), id.to_string())))
                .collect()
        })
        .unwrap_or_default()
}
