use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;

use crate::ee2::job_request::JobId;

/// How a single upload ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    /// The import job was never accepted by the service
    ImportRejected { reason: String },
    /// Import completed and the assembly job was submitted
    Assembled { reads_ref: String, assembly_job_id: JobId },
    /// Import completed but the assembly job could not be submitted
    AssemblyRejected { reads_ref: String, reason: String },
    /// Import completed without a reads object reference in its output
    MissingOutput,
    Terminated,
    Errored { message: Option<String> },
    /// Still unresolved when the deadline passed
    TimedOut,
    /// Still unresolved when the run was cancelled
    Cancelled,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Assembled { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobOutcome::ImportRejected { .. } => "import rejected",
            JobOutcome::Assembled { .. } => "assembly submitted",
            JobOutcome::AssemblyRejected { .. } => "assembly rejected",
            JobOutcome::MissingOutput => "import output missing",
            JobOutcome::Terminated => "import terminated",
            JobOutcome::Errored { .. } => "import failed",
            JobOutcome::TimedOut => "timed out",
            JobOutcome::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub name: String,
    pub import_job_id: Option<JobId>,
    #[serde(flatten)]
    pub outcome: JobOutcome,
}

/// Outcome of every upload in one run
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub jobs: Vec<JobReport>,
}

impl BatchReport {
    pub fn new(started_at: DateTime<Utc>, jobs: Vec<JobReport>) -> BatchReport {
        BatchReport { started_at, finished_at: Utc::now(), jobs }
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &JobReport> {
        self.jobs.iter().filter(|job| job.outcome.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &JobReport> {
        self.jobs.iter().filter(|job| !job.outcome.is_success())
    }

    pub fn log_summary(&self) {
        let elapsed = self.finished_at - self.started_at;
        info!("Batch finished in {}s: {} of {} uploads reached assembly",
            elapsed.num_seconds(), self.succeeded().count(), self.jobs.len());
        for job in self.succeeded() {
            info!("{}: {}", job.name, job.outcome.label());
        }
        for job in self.failed() {
            warn!("{}: {}", job.name, job.outcome.label());
        }
    }

    /// Write the report as pretty JSON
    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        info!("Writing batch report to {}", path.display());
        fs::write(path, json)?;
        Ok(())
    }
}
