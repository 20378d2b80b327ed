//! In-memory job client that replays scripted job statuses

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ee2::client::{ClientError, JobClient};
use crate::ee2::job_request::{JobId, JobOutput, JobRequest, JobStatus, SpadesParams};

#[derive(Default)]
pub struct ScriptedClient {
    rejected_imports: HashSet<String>,
    reject_assemblies: bool,
    failing_queries: AtomicUsize,
    /// Statuses returned on successive polls, the last one repeats
    scripts: Mutex<HashMap<JobId, VecDeque<JobStatus>>>,
    submitted: Mutex<Vec<JobRequest>>,
    queries: Mutex<Vec<Vec<JobId>>>,
}

impl ScriptedClient {
    pub fn new() -> ScriptedClient {
        ScriptedClient::default()
    }

    pub fn reject_import(mut self, name: &str) -> ScriptedClient {
        self.rejected_imports.insert(name.to_string());
        self
    }

    pub fn reject_assemblies(mut self) -> ScriptedClient {
        self.reject_assemblies = true;
        self
    }

    /// Fail the next `count` status queries
    pub fn fail_queries(self, count: usize) -> ScriptedClient {
        self.failing_queries.store(count, Ordering::SeqCst);
        self
    }

    pub fn script(self, job_id: &str, statuses: Vec<JobStatus>) -> ScriptedClient {
        self.scripts.lock().unwrap().insert(JobId::from(job_id), statuses.into());
        self
    }

    pub fn submitted(&self) -> Vec<JobRequest> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn assemblies(&self) -> Vec<SpadesParams> {
        self.submitted()
            .into_iter()
            .filter_map(|request| match request {
                JobRequest::AssembleReads(job) => Some(job.app_params().clone()),
                JobRequest::ImportReads(_) => None,
            })
            .collect()
    }

    pub fn queries(&self) -> Vec<Vec<JobId>> {
        self.queries.lock().unwrap().clone()
    }
}

pub fn completed(obj_ref: &str) -> JobStatus {
    JobStatus::Completed {
        output: Some(JobOutput { result: vec![serde_json::json!({ "obj_ref": obj_ref })] }),
    }
}

fn rejected(method: &str) -> ClientError {
    ClientError::Rpc {
        method: method.to_string(),
        name: "JSONRPCError".to_string(),
        message: "rejected by script".to_string(),
    }
}

#[async_trait]
impl JobClient for ScriptedClient {
    async fn submit(&self, request: &JobRequest) -> Result<JobId, ClientError> {
        self.submitted.lock().unwrap().push(request.clone());
        match request {
            JobRequest::ImportReads(job) => {
                let name = &job.app_params().name;
                if self.rejected_imports.contains(name) {
                    return Err(rejected(request.method()));
                }
                Ok(JobId(format!("import-{name}")))
            }
            JobRequest::AssembleReads(job) => {
                if self.reject_assemblies {
                    return Err(rejected(request.method()));
                }
                Ok(JobId(format!("assembly-{}", job.app_params().output_contigset_name)))
            }
        }
    }

    async fn query_statuses(&self, ids: &[JobId]) -> Result<HashMap<JobId, JobStatus>, ClientError> {
        self.queries.lock().unwrap().push(ids.to_vec());

        let failing = self.failing_queries.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_queries.store(failing - 1, Ordering::SeqCst);
            return Err(ClientError::Http { status: 503, body: "unavailable".to_string() });
        }

        let mut scripts = self.scripts.lock().unwrap();
        let statuses = ids.iter()
            .map(|id| {
                let status = match scripts.get_mut(id) {
                    Some(script) if script.len() > 1 => script.pop_front().unwrap(),
                    Some(script) => script.front().cloned().unwrap_or(JobStatus::Queued),
                    None => JobStatus::Queued,
                };
                (id.clone(), status)
            })
            .collect();
        Ok(statuses)
    }
}
