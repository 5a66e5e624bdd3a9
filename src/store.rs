use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::dedupe::dedupe;
use crate::models::Job;

/// JSON array of jobs on disk. Writes always merge with what is already there.
pub struct JobStore {
    path: PathBuf,
}

impl JobStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory: {}", parent.display())
                })?;
            }
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persisted jobs; empty when the file is missing or unreadable.
    pub fn load(&self) -> Vec<Job> {
        if !self.path.exists() {
            return Vec::new();
        }
        match self.read() {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!("Ignoring persisted jobs: {:#}", e);
                Vec::new()
            }
        }
    }

    fn read(&self) -> Result<Vec<Job>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Malformed job data in {}", self.path.display()))
    }

    pub fn backup_path(&self) -> PathBuf {
        self.path.with_extension("json.bak")
    }

    /// Stored jobs for a merge. An unreadable file is moved aside to the
    /// backup path first so the rewrite never discards it.
    fn existing_for_merge(&self) -> Result<Vec<Job>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        match self.read() {
            Ok(jobs) => Ok(jobs),
            Err(e) => {
                let backup = self.backup_path();
                warn!("{:#}; moving it to {}", e, backup.display());
                fs::rename(&self.path, &backup)
                    .with_context(|| format!("Failed to back up {}", self.path.display()))?;
                Ok(Vec::new())
            }
        }
    }

    /// Merges `jobs` into the stored set and rewrites the file.
    pub fn save_merged(&self, jobs: Vec<Job>) -> Result<Vec<Job>> {
        let merged = dedupe(self.existing_for_merge()?, jobs);
        let json = serde_json::to_string_pretty(&merged).context("Failed to serialize jobs")?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        info!("Saved {} jobs to {}", merged.len(), self.path.display());
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_job;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let store = JobStore::open(tmp.path().join("nested/jobs.json")).unwrap();
        assert!(store.load().is_empty());
        assert!(tmp.path().join("nested").is_dir());
    }

    #[test]
    fn test_save_merges_with_existing_file() {
        let tmp = TempDir::new().unwrap();
        let store = JobStore::open(tmp.path().join("jobs.json")).unwrap();

        store
            .save_merged(vec![sample_job("SRE", "Acme", "Lever-Acme")])
            .unwrap();
        let merged = store
            .save_merged(vec![
                sample_job("sre ", "ACME", "Remotive"),
                sample_job("DevOps Engineer", "Globex", "Greenhouse-Globex"),
            ])
            .unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].source, "Lever-Acme");
        assert_eq!(store.load(), merged);
    }

    #[test]
    fn test_malformed_file_is_backed_up_before_rewrite() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("jobs.json");
        let old = serde_json::to_string(&sample_job("Old SRE", "Acme", "Lever-Acme")).unwrap();
        let broken = format!("[{},]", old);
        fs::write(&path, &broken).unwrap();

        let store = JobStore::open(&path).unwrap();
        assert!(store.load().is_empty());
        let merged = store
            .save_merged(vec![sample_job("New SRE", "Globex", "Lever-Globex")])
            .unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(store.load(), merged);
        let backup = fs::read_to_string(store.backup_path()).unwrap();
        assert_eq!(backup, broken);
        assert!(backup.contains("Old SRE"));
    }

    #[test]
    fn test_missing_file_creates_no_backup() {
        let tmp = TempDir::new().unwrap();
        let store = JobStore::open(tmp.path().join("jobs.json")).unwrap();
        store
            .save_merged(vec![sample_job("SRE", "Acme", "Lever")])
            .unwrap();
        assert!(!store.backup_path().exists());
    }
}
