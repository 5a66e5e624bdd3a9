use anyhow::{Context, Result};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::models::{Job, RunConfig};

pub const DEFAULT_MAX_WORKERS: usize = 10;

/// Fans per-target scrape work out over a bounded set of blocking workers.
///
/// Every target is attempted. A target that errors or panics contributes no
/// jobs and never affects the others. In parallel mode results arrive in
/// completion order; sequential mode keeps target order.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    parallel: bool,
    max_workers: usize,
}

impl WorkerPool {
    pub fn new(parallel: bool, max_workers: usize) -> Self {
        Self {
            parallel,
            max_workers: max_workers.max(1),
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.parallel, config.max_workers)
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn run<T, F>(&self, label: &str, targets: Vec<(String, T)>, task: F) -> Vec<Job>
    where
        T: Send + 'static,
        F: Fn(&str, T) -> Result<Vec<Job>> + Send + Sync + 'static,
    {
        if !self.parallel || targets.len() <= 1 {
            return run_sequential(label, targets, &task);
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(self.max_workers)
            .thread_name("jobscout-worker")
            .build()
            .context("Failed to start worker pool runtime");

        match runtime {
            Ok(runtime) => runtime.block_on(collect_parallel(
                label.to_string(),
                self.max_workers,
                targets,
                Arc::new(task),
            )),
            Err(e) => {
                warn!("{}: {:#}; running targets sequentially", label, e);
                run_sequential(label, targets, &task)
            }
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(true, DEFAULT_MAX_WORKERS)
    }
}

fn run_sequential<T, F>(label: &str, targets: Vec<(String, T)>, task: &F) -> Vec<Job>
where
    F: Fn(&str, T) -> Result<Vec<Job>>,
{
    let mut jobs = Vec::new();
    for (name, target) in targets {
        match catch_unwind(AssertUnwindSafe(|| task(&name, target))) {
            Ok(Ok(found)) => jobs.extend(found),
            Ok(Err(e)) => debug!("{}: target {} failed: {:#}", label, name, e),
            Err(_) => warn!("{}: target {} panicked", label, name),
        }
    }
    jobs
}

async fn collect_parallel<T, F>(
    label: String,
    max_workers: usize,
    targets: Vec<(String, T)>,
    task: Arc<F>,
) -> Vec<Job>
where
    T: Send + 'static,
    F: Fn(&str, T) -> Result<Vec<Job>> + Send + Sync + 'static,
{
    let permits = Arc::new(Semaphore::new(max_workers));
    let mut set = JoinSet::new();
    let mut jobs = Vec::new();

    for (name, target) in targets {
        let permit = match Arc::clone(&permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                warn!("{}: worker pool closed before {}: {}", label, name, e);
                continue;
            }
        };
        let task = Arc::clone(&task);
        set.spawn_blocking(move || {
            let _permit = permit;
            let result = (*task)(&name, target);
            (name, result)
        });
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((_, Ok(found))) => jobs.extend(found),
            Ok((name, Err(e))) => debug!("{}: target {} failed: {:#}", label, name, e),
            Err(e) => warn!("{}: worker task failed: {}", label, e),
        }
    }

    jobs
}
