use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;

use crate::models::{DESCRIPTION_LIMIT, SALARY_NOT_SPECIFIED};

// Order matters: the first pattern that matches anywhere in the text wins.
const SALARY_PATTERNS: &[&str] = &[
    r"(?i)\$[\d,]+\s*[-–]\s*\$[\d,]+",          // $120,000 - $150,000
    r"(?i)\$[\d,]+k?\s*[-–]\s*\$?[\d,]+k?",     // $120k-$150k, $120k-150k
    r"(?i)CAD\s*[\d,]+\s*[-–]\s*[\d,]+",        // CAD 100,000-130,000
    r"(?i)USD\s*[\d,]+\s*[-–]\s*[\d,]+",        // USD 90000 - 120000
    r"(?i)\$[\d,]+\+?",                         // $200,000+
];

static SALARY_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    SALARY_PATTERNS
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// Best-effort salary text, or the "Not specified" sentinel.
pub fn extract_salary(text: &str) -> String {
    SALARY_REGEXES
        .iter()
        .find_map(|re| re.find(text))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| SALARY_NOT_SPECIFIED.to_string())
}

/// Visible text of an HTML fragment with whitespace collapsed.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    collapse_whitespace(&text)
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates on a character boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

pub fn description(text: &str) -> String {
    truncate_chars(text, DESCRIPTION_LIMIT)
}

pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Drops tracking query parameters and fragments from a job link.
pub fn clean_tracking_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    let end = url.find(['?', '#']).unwrap_or(url.len());
    Some(url[..end].to_string())
}
