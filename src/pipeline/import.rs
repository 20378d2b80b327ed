use log::{error, info, warn};

use crate::config::Config;
use crate::ee2::client::JobClient;
use crate::ee2::job_request::{JobId, JobRequest};
use crate::pipeline::report::{JobOutcome, JobReport};
use crate::pipeline::submission::{submit, PendingJobs};
use crate::request::schema::PayloadSchemas;
use crate::request::upload::UploadSpec;

/// Result of submitting one import job per upload
#[derive(Debug, Default)]
pub struct ImportBatch {
    /// Accepted job ids, in submission order
    pub job_ids: Vec<JobId>,
    pub pending: PendingJobs,
    /// Uploads whose import job was not accepted
    pub rejected: Vec<JobReport>,
}

impl ImportBatch {
    /// True when every upload has an import job
    pub fn is_complete(&self, uploads: usize) -> bool {
        self.job_ids.len() == uploads
    }
}

/// Submit an import job for every upload
///
/// Every request is validated before the first one is sent. If any upload fails validation
/// nothing is submitted and each invalid upload is reported as rejected. Past that point a failed
/// submission is logged and skipped so the rest of the batch still goes out. Callers compare
/// [`ImportBatch::job_ids`] against the number of uploads to detect a shortfall.
pub async fn submit_imports<C: JobClient>(client: &C, schemas: &PayloadSchemas, config: &Config, uploads: &[UploadSpec]) -> ImportBatch {
    let mut batch = ImportBatch::default();
    let requests: Vec<JobRequest> = uploads.iter()
        .map(|upload| JobRequest::import_reads(upload, config))
        .collect();

    for (upload, request) in uploads.iter().zip(&requests) {
        if let Err(err) = schemas.validate(request) {
            warn!("Upload {} is invalid: {}", upload.name, err);
            batch.rejected.push(rejected(upload, &err));
        }
    }
    if !batch.rejected.is_empty() {
        error!("{} of {} uploads are invalid, no import jobs submitted", batch.rejected.len(), uploads.len());
        return batch;
    }

    for (upload, request) in uploads.iter().zip(&requests) {
        match submit(client, schemas, request).await {
            Ok(job_id) => {
                batch.pending.insert(job_id.clone(), upload.name.clone());
                batch.job_ids.push(job_id);
            }
            Err(err) => batch.rejected.push(rejected(upload, &err)),
        }
    }

    let ids: Vec<String> = batch.job_ids.iter().map(JobId::to_string).collect();
    info!("Submitted import job ids: [{}]", ids.join(", "));
    info!("Tracking {} pending import jobs", batch.pending.len());
    batch
}

fn rejected(upload: &UploadSpec, reason: &dyn std::fmt::Display) -> JobReport {
    JobReport {
        name: upload.name.clone(),
        import_job_id: None,
        outcome: JobOutcome::ImportRejected { reason: reason.to_string() },
    }
}
