//! Job Watcher
//!
//! Polls the status store for submitted jobs and reports every observed
//! change, the way a remote client polling the status endpoint would see it.

use crate::discovery::WorkerPool;
use crate::model::{JobId, JobStatus};
use crate::query::QueryFacade;
use std::time::{Duration, Instant};

/// Level of detail for status lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailLevel {
    /// Icon, status and job label
    Minimal,
    /// Adds the job id and elapsed time
    #[default]
    Detailed,
}

fn status_icon(status: Option<JobStatus>) -> &'static str {
    status.map(|s| s.icon()).unwrap_or("◯")
}

fn status_text(status: Option<JobStatus>) -> &'static str {
    status.map(|s| s.as_str()).unwrap_or("Pending")
}

/// A job being watched
#[derive(Debug, Clone)]
pub struct WatchedJob {
    pub job_id: JobId,
    pub label: String,
    /// Last observed status; `None` while nothing has been written
    pub last_seen: Option<JobStatus>,
    pub created_at: Instant,
    pub completed_at: Option<Instant>,
}

impl WatchedJob {
    pub fn new(job_id: JobId, label: impl Into<String>) -> Self {
        Self {
            job_id,
            label: label.into(),
            last_seen: None,
            created_at: Instant::now(),
            completed_at: None,
        }
    }

    /// Record an observation; returns whether it differs from the last one
    fn observe(&mut self, status: Option<JobStatus>) -> bool {
        if status == self.last_seen {
            return false;
        }
        self.last_seen = status;
        // Another task under the same id may still move it back to InProgress
        self.completed_at = match status {
            Some(s) if s.is_terminal() => Some(Instant::now()),
            _ => None,
        };
        true
    }

    /// Get duration of the job (or elapsed time if still running)
    pub fn duration(&self) -> Duration {
        self.completed_at
            .unwrap_or_else(Instant::now)
            .duration_since(self.created_at)
    }

    /// Format duration for display
    pub fn duration_display(&self) -> String {
        let d = self.duration();
        if d.as_secs() < 1 {
            format!("{}ms", d.as_millis())
        } else if d.as_secs() < 60 {
            format!("{}s", d.as_secs())
        } else {
            format!("{}m{}s", d.as_secs() / 60, d.as_secs() % 60)
        }
    }

    pub fn status_line(&self, detail_level: DetailLevel) -> String {
        let icon = status_icon(self.last_seen);
        let text = status_text(self.last_seen);

        match detail_level {
            DetailLevel::Minimal => format!("{} {} {}", icon, text, self.label),
            DetailLevel::Detailed => format!(
                "{} {} {} [{}] ({})",
                icon,
                text,
                self.label,
                self.job_id,
                self.duration_display()
            ),
        }
    }
}

/// Watches a set of jobs until the worker pool drains
pub struct JobWatch {
    jobs: Vec<WatchedJob>,
    pub poll_interval: Duration,
    pub detail_level: DetailLevel,
}

impl JobWatch {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            jobs: Vec::new(),
            poll_interval,
            detail_level: DetailLevel::default(),
        }
    }

    pub fn track(&mut self, job_id: JobId, label: impl Into<String>) {
        self.jobs.push(WatchedJob::new(job_id, label));
    }

    pub fn jobs(&self) -> &[WatchedJob] {
        &self.jobs
    }

    /// Poll every job once and return a line per changed status
    pub fn poll(&mut self, queries: &QueryFacade) -> Vec<String> {
        let detail_level = self.detail_level;
        self.jobs
            .iter_mut()
            .filter_map(|job| {
                let status = queries.job_status(job.job_id);
                job.observe(status).then(|| job.status_line(detail_level))
            })
            .collect()
    }

    /// Poll at the configured interval until `pool` is idle, then poll once
    /// more so the final statuses are reported.
    pub async fn run(
        &mut self,
        pool: &WorkerPool,
        queries: &QueryFacade,
        mut emit: impl FnMut(&str),
    ) {
        loop {
            for line in self.poll(queries) {
                emit(&line);
            }

            if pool.in_flight() == 0 {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = pool.wait_idle() => {}
            }
        }

        for job in &self.jobs {
            tracing::info!(
                job_id = %job.job_id,
                "Watch finished: {}",
                job.status_line(DetailLevel::Detailed)
            );
        }
    }
}
