//! Poll import jobs until each resolves and start an assembly for every completed import
//!
//! Every import job starts out pending. Each round the coordinator waits for the poll interval,
//! asks the service for the status of all pending jobs in one call and resolves the ones that
//! reached a terminal status:
//!
//! - `completed`: the reads object reference is taken from the first result entry of the job
//!   output and an assembly job is submitted for it
//! - `terminated` / `error`: the job is dropped, no assembly
//!
//! A resolved job leaves the working set immediately and is never queried again. A failed status
//! query is retried on the next round. The loop ends when the working set is empty or the
//! cancellation token fires. Once the optional deadline passes the pending jobs get one last
//! status check and whatever is still unresolved is reported as timed out.

use std::collections::{BTreeSet, HashMap};

use log::{debug, info, warn};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::ee2::client::JobClient;
use crate::ee2::job_request::{JobId, JobStatus};
use crate::pipeline::assembly::submit_assembly;
use crate::pipeline::report::{JobOutcome, JobReport};
use crate::pipeline::submission::PendingJobs;
use crate::request::schema::PayloadSchemas;

pub struct Coordinator<'a, C: JobClient> {
    client: &'a C,
    schemas: &'a PayloadSchemas,
    config: &'a Config,
}

impl<'a, C: JobClient> Coordinator<'a, C> {
    pub fn new(client: &'a C, schemas: &'a PayloadSchemas, config: &'a Config) -> Self {
        Coordinator { client, schemas, config }
    }

    /// Poll `job_ids` to resolution, returning one report per job
    pub async fn run(&self, job_ids: Vec<JobId>, mut pending: PendingJobs, cancel: &CancellationToken) -> Vec<JobReport> {
        let deadline = self.config.deadline.map(|timeout| Instant::now() + timeout);
        let mut working: BTreeSet<JobId> = job_ids.into_iter().collect();
        let mut reports = Vec::with_capacity(working.len());

        info!("Waiting on {} import jobs before submitting assemblies", working.len());

        while !working.is_empty() {
            let mut wake = Instant::now() + self.config.poll_interval;
            if let Some(deadline) = deadline {
                wake = wake.min(deadline);
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!("Cancelled with {} import jobs unresolved", working.len());
                    drain(&mut working, &mut pending, JobOutcome::Cancelled, &mut reports);
                    break;
                }
                _ = sleep_until(wake) => {}
            }

            let expired = deadline.is_some_and(|deadline| Instant::now() >= deadline);
            if expired {
                info!("Deadline reached, checking {} import jobs one last time", working.len());
            }

            let ids: Vec<JobId> = working.iter().cloned().collect();
            debug!("Checking status of {} jobs", ids.len());
            let statuses = match self.client.query_statuses(&ids).await {
                Ok(statuses) => statuses,
                Err(err) => {
                    warn!("Can't check job status: {}", err);
                    HashMap::new()
                }
            };

            for job_id in &ids {
                let Some(status) = statuses.get(job_id) else {
                    debug!("No status returned for job {}", job_id);
                    continue;
                };
                if status.is_terminal() {
                    info!("Job {} finished: {:?}", job_id, status);
                } else {
                    debug!("Job {} is {:?}", job_id, status);
                }

                let outcome = match status {
                    JobStatus::Queued | JobStatus::Running | JobStatus::Other(_) => continue,
                    JobStatus::Completed { output } => {
                        let name = pending.get(job_id).unwrap_or(job_id.0.as_str()).to_string();
                        match output.as_ref().and_then(|output| output.object_ref()) {
                            Some(reads_ref) => {
                                submit_assembly(self.client, self.schemas, self.config, reads_ref, &name).await
                            }
                            None => {
                                warn!("Job {} completed without a reads object reference", job_id);
                                JobOutcome::MissingOutput
                            }
                        }
                    }
                    JobStatus::Terminated => JobOutcome::Terminated,
                    JobStatus::Error { message } => JobOutcome::Errored { message: message.clone() },
                };

                working.remove(job_id);
                reports.push(resolve(job_id, &mut pending, outcome));
            }

            if expired && !working.is_empty() {
                warn!("Deadline passed with {} import jobs unresolved", working.len());
                drain(&mut working, &mut pending, JobOutcome::TimedOut, &mut reports);
            }
        }

        info!("Stopped polling, {} import jobs resolved", reports.len());
        reports
    }
}

/// End tracking of a job and record its outcome under the upload name
fn resolve(job_id: &JobId, pending: &mut PendingJobs, outcome: JobOutcome) -> JobReport {
    let name = pending.remove(job_id).unwrap_or_else(|| job_id.to_string());
    JobReport { name, import_job_id: Some(job_id.clone()), outcome }
}

fn drain(working: &mut BTreeSet<JobId>, pending: &mut PendingJobs, outcome: JobOutcome, reports: &mut Vec<JobReport>) {
    for job_id in std::mem::take(working) {
        reports.push(resolve(&job_id, pending, outcome.clone()));
    }
}
