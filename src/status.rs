use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStatus {
    pub running: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub message: String,
}

/// Single writer for run progress; readers only ever see whole snapshots.
///
/// The single-run guard only holds across runs that share one board, so a
/// long-lived host keeps one board for its lifetime. The CLI makes a fresh
/// board per invocation and uses it for the final status line.
pub struct StatusBoard {
    tx: watch::Sender<RunStatus>,
}

#[derive(Clone)]
pub struct StatusReader {
    rx: watch::Receiver<RunStatus>,
}

impl StatusBoard {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(RunStatus::default());
        Self { tx }
    }

    pub fn reader(&self) -> StatusReader {
        StatusReader {
            rx: self.tx.subscribe(),
        }
    }

    /// Marks a run as started. Fails if one is already in flight.
    pub fn begin(&self, message: &str) -> Result<()> {
        let mut started = false;
        self.tx.send_if_modified(|status| {
            if status.running {
                return false;
            }
            status.running = true;
            status.message = message.to_string();
            started = true;
            true
        });
        if !started {
            bail!("A scrape is already running");
        }
        Ok(())
    }

    pub fn finish(&self, outcome: Result<usize, &anyhow::Error>) {
        self.tx.send_modify(|status| {
            status.running = false;
            match outcome {
                Ok(count) => {
                    status.last_run = Some(Utc::now());
                    status.message = format!("Scrape completed: {} jobs", count);
                }
                Err(e) => status.message = format!("Scrape failed: {:#}", e),
            }
        });
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusReader {
    pub fn snapshot(&self) -> RunStatus {
        self.rx.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_begin_and_finish() {
        let board = StatusBoard::new();
        let reader = board.reader();
        assert!(!reader.snapshot().running);

        board.begin("Scraping jobs...").unwrap();
        let status = reader.snapshot();
        assert!(status.running);
        assert_eq!(status.message, "Scraping jobs...");

        board.finish(Ok(12));
        let status = reader.snapshot();
        assert!(!status.running);
        assert!(status.last_run.is_some());
        assert_eq!(status.message, "Scrape completed: 12 jobs");
    }

    #[test]
    fn test_only_one_run_in_flight() {
        let board = StatusBoard::new();
        board.begin("first").unwrap();
        assert!(board.begin("second").is_err());
        assert_eq!(board.reader().snapshot().message, "first");

        let err = anyhow!("disk full");
        board.finish(Err(&err));
        let status = board.reader().snapshot();
        assert_eq!(status.message, "Scrape failed: disk full");
        assert!(status.last_run.is_none());
        assert!(board.begin("third").is_ok());
    }

    #[test]
    fn test_reader_on_another_thread_sees_running_run() {
        let board = StatusBoard::new();
        let reader = board.reader();
        board.begin("Scraping jobs...").unwrap();

        let seen = std::thread::spawn(move || reader.snapshot()).join().unwrap();
        assert!(seen.running);
        assert!(board.begin("again").is_err());

        board.finish(Ok(0));
        assert!(!board.reader().snapshot().running);
    }
}
