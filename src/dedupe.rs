use std::collections::HashSet;

use crate::models::Job;

/// Merges `incoming` into `existing`, keeping the first job seen for each
/// `(title, company)` identity. Existing jobs are visited first, so a stored
/// posting is never replaced by a re-scraped copy.
pub fn dedupe(existing: Vec<Job>, incoming: Vec<Job>) -> Vec<Job> {
    let mut seen = HashSet::with_capacity(existing.len() + incoming.len());
    existing
        .into_iter()
        .chain(incoming)
        .filter(|job| seen.insert(job.identity_key()))
        .collect()
}

/// Collapses duplicates within one batch.
pub fn dedupe_batch(jobs: Vec<Job>) -> Vec<Job> {
    dedupe(Vec::new(), jobs)
}
