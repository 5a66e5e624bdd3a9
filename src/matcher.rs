use regex::Regex;
use tracing::warn;

use crate::models::RunConfig;

pub const DEFAULT_KEYWORDS: &[&str] = &[
    "devops",
    "sre",
    "site reliability",
    "platform engineer",
    "infrastructure",
    "cloud engineer",
    "devsecops",
    "kubernetes",
    "terraform",
];

/// Used when no allow-list is configured.
pub const DEFAULT_ALLOWED_LOCATIONS: &[&str] = &[
    "united states",
    "usa",
    "u.s.",
    "america",
    "canada",
    "canadian",
    "remote",
    "north america",
    "worldwide",
    "anywhere",
    "global",
];

/// A location phrase compiled for word-boundary matching.
#[derive(Debug, Clone)]
struct Phrase {
    pattern: Regex,
}

impl Phrase {
    fn compile(raw: &str) -> Option<Self> {
        let text = raw.trim().to_lowercase();
        if text.is_empty() {
            return None;
        }
        let body = text
            .split_whitespace()
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(r"\s+");
        let source = format!(r"(?i)(?:^|[^\p{{L}}\p{{N}}]){}(?:$|[^\p{{L}}\p{{N}}])", body);
        match Regex::new(&source) {
            Ok(pattern) => Some(Self { pattern }),
            Err(e) => {
                warn!("Skipping location phrase {:?}: {}", raw, e);
                None
            }
        }
    }

    fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

/// Keyword and location filter shared by every adapter of a run.
#[derive(Debug, Clone)]
pub struct Matcher {
    keywords: Vec<String>,
    allowed: Vec<Phrase>,
    excluded: Vec<String>,
    remote_allowed: bool,
}

impl Matcher {
    pub fn new(keywords: &[String], allowed: &[String], excluded: &[String]) -> Self {
        let keywords = lowered(keywords);
        let keywords = if keywords.is_empty() {
            DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
        } else {
            keywords
        };

        let remote_allowed = allowed.iter().any(|a| a.trim().eq_ignore_ascii_case("remote"));
        let allowed: Vec<Phrase> = if allowed.iter().any(|a| !a.trim().is_empty()) {
            allowed.iter().filter_map(|a| Phrase::compile(a)).collect()
        } else {
            DEFAULT_ALLOWED_LOCATIONS
                .iter()
                .filter_map(|a| Phrase::compile(a))
                .collect()
        };

        Self {
            keywords,
            allowed,
            excluded: lowered(excluded),
            remote_allowed,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(
            &config.keywords,
            &config.allowed_locations,
            &config.excluded_locations,
        )
    }

    /// Effective keyword list (the defaults when none were configured).
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Plain case-insensitive substring match against `title + " " + description`.
    pub fn matches_keywords(&self, title: &str, description: &str) -> bool {
        let text = format!("{} {}", title, description).to_lowercase();
        self.keywords.iter().any(|kw| text.contains(kw.as_str()))
    }

    /// Exclusions are substring matches and always win. A provider-flagged remote
    /// posting passes when "remote" is explicitly allowed; otherwise one allowed
    /// phrase has to match on word boundaries.
    pub fn matches_location(&self, text: &str, remote: bool) -> bool {
        let lower = text.to_lowercase();
        if self.excluded.iter().any(|exc| lower.contains(exc.as_str())) {
            return false;
        }
        if remote && self.remote_allowed {
            return true;
        }
        self.allowed.iter().any(|phrase| phrase.is_match(&lower))
    }
}

fn lowered(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn matcher(keywords: &[&str], allowed: &[&str], excluded: &[&str]) -> Matcher {
        Matcher::new(&strings(keywords), &strings(allowed), &strings(excluded))
    }

    #[test]
    fn test_keywords_are_case_insensitive_substrings() {
        let m = matcher(&["devops"], &[], &[]);
        assert!(m.matches_keywords("Senior DevOps/SRE Engineer", ""));
        assert!(m.matches_keywords("Engineer", "Join our DEVOPS team"));
        assert!(!m.matches_keywords("Barista", "Make coffee"));
    }

    #[test]
    fn test_empty_keywords_fall_back_to_defaults() {
        let m = matcher(&[], &[], &[]);
        assert_eq!(m.keywords().len(), DEFAULT_KEYWORDS.len());
        assert!(m.matches_keywords("Kubernetes Specialist", ""));
        assert!(!m.matches_keywords("Accountant", ""));
    }

    #[test]
    fn test_blank_keywords_are_ignored() {
        let m = matcher(&["  ", "sre"], &[], &[]);
        assert_eq!(m.keywords(), &["sre".to_string()]);
        assert!(!m.matches_keywords("Barista", "coffee"));
    }

    #[test]
    fn test_exclusion_wins_over_inclusion() {
        let m = matcher(&[], &["remote"], &["uk only"]);
        assert!(!m.matches_location("Remote (UK only)", false));
        assert!(!m.matches_location("Remote (UK only)", true));
        assert!(m.matches_location("Remote", false));
    }

    #[test]
    fn test_word_boundary_rejects_fragments() {
        let m = matcher(&[], &["us"], &[]);
        assert!(!m.matches_location("genius remote role", false));
        assert!(!m.matches_location("bonus included", false));
        assert!(m.matches_location("Remote - US", false));
        assert!(m.matches_location("US", false));
        assert!(m.matches_location("Austin, TX (US)", false));
    }

    #[test]
    fn test_multi_word_phrase_matches_token_sequence() {
        let m = matcher(&[], &["new york"], &[]);
        assert!(m.matches_location("New York, NY", false));
        assert!(m.matches_location("Hybrid - New   York", false));
        assert!(!m.matches_location("New Yorker Hotel", false));
        assert!(!m.matches_location("York", false));
    }

    #[test]
    fn test_punctuated_phrase() {
        let m = matcher(&[], &["u.s."], &[]);
        assert!(m.matches_location("Remote (U.S.)", false));
        assert!(m.matches_location("U.S. only", false));
        assert!(!m.matches_location("Ulus area", false));
    }

    #[test]
    fn test_default_locations_used_when_allow_list_empty() {
        let m = matcher(&[], &[], &[]);
        assert_eq!(m.allowed.len(), DEFAULT_ALLOWED_LOCATIONS.len());
        assert!(m.matches_location("North America", false));
        assert!(m.matches_location("Toronto, Canada", false));
        assert!(m.matches_location("Anywhere", false));
        assert!(!m.matches_location("Berlin, Germany", false));
        assert!(!m.matches_location("Globalization Office", false));
    }

    #[test]
    fn test_remote_flag_is_authoritative_when_remote_allowed() {
        let m = matcher(&[], &["Remote", "usa"], &[]);
        assert!(m.matches_location("Berlin", true));
        assert!(!m.matches_location("Berlin", false));

        let no_remote = matcher(&[], &["usa"], &[]);
        assert!(!no_remote.matches_location("Berlin", true));
    }

    #[test]
    fn test_duplicate_phrases_are_harmless() {
        let m = matcher(&["sre", "sre"], &["usa", "usa"], &["london", "london"]);
        assert!(m.matches_keywords("SRE", ""));
        assert!(m.matches_location("Denver, USA", false));
        assert!(!m.matches_location("London, USA office", false));
    }
}
