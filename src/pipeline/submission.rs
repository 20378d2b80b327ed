use std::collections::HashMap;

use log::{info, warn};

use crate::config::ConfigError;
use crate::ee2::client::{ClientError, JobClient};
use crate::ee2::job_request::{JobId, JobRequest};
use crate::request::schema::{PayloadSchemas, RequestError};

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Invalid(#[from] RequestError),
    #[error(transparent)]
    Rejected(#[from] ClientError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Logical upload names of submitted import jobs, looked up again once each job resolves
#[derive(Debug, Default)]
pub struct PendingJobs {
    names: HashMap<JobId, String>,
}

impl PendingJobs {
    pub fn insert(&mut self, job_id: JobId, name: String) {
        self.names.insert(job_id, name);
    }

    pub fn get(&self, job_id: &JobId) -> Option<&str> {
        self.names.get(job_id).map(String::as_str)
    }

    pub fn remove(&mut self, job_id: &JobId) -> Option<String> {
        self.names.remove(job_id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

/// Validate a request against its payload schema, then submit it
///
/// Failures are logged along with the rejected payload and returned to the caller.
pub async fn submit<C: JobClient>(client: &C, schemas: &PayloadSchemas, request: &JobRequest) -> Result<JobId, SubmissionError> {
    let result = match schemas.validate(request) {
        Ok(_) => client.submit(request).await.map_err(SubmissionError::from),
        Err(err) => Err(SubmissionError::from(err)),
    };

    match result {
        Ok(job_id) => {
            info!("Submitted {} job {}", request.kind(), job_id);
            Ok(job_id)
        }
        Err(err) => {
            warn!("Failed to submit {} job ({}): {}", request.kind(), request.method(), err);
            match serde_json::to_string_pretty(request) {
                Ok(payload) => warn!("Rejected request:\n{}", payload),
                Err(_) => warn!("Rejected request: {:?}", request),
            }
            Err(err)
        }
    }
}
