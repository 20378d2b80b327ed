use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use crate::config::Config;
use crate::ee2::job_request::{JobId, JobRequest, JobState, JobStatus};

/// Name of the execution engine service in JSON-RPC method names
static SERVICE: &str = "execution_engine2";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("execution engine returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("execution engine rejected {method}: {name}: {message}")]
    Rpc { method: String, name: String, message: String },
    #[error("unexpected response to {method}: {message}")]
    Malformed { method: String, message: String },
}

/// The remote job execution service
#[async_trait]
pub trait JobClient: Send + Sync {
    /// Submit a job, returning the id the service assigned to it
    async fn submit(&self, request: &JobRequest) -> Result<JobId, ClientError>;

    /// Current status of every job in `ids`, in one call
    async fn query_statuses(&self, ids: &[JobId]) -> Result<HashMap<JobId, JobStatus>, ClientError>;
}

/// JSON-RPC 1.1 client for the execution engine
pub struct Ee2Client {
    client: reqwest::Client,
    endpoint: Url,
    token: String,
    next_id: AtomicU64,
}

#[derive(Serialize)]
struct RpcRequest<P> {
    version: &'static str,
    method: String,
    params: P,
    id: String,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    name: String,
    #[serde(default)]
    message: String,
}

/// `check_jobs` returns `[{"job_states": [...]}]`
#[derive(Deserialize)]
struct CheckJobsResult {
    job_states: Vec<JobState>,
}

impl Ee2Client {
    pub fn new(config: &Config) -> Ee2Client {
        Ee2Client::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: &Config) -> Ee2Client {
        Ee2Client {
            client,
            endpoint: config.endpoint.clone(),
            token: config.token.clone(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Call `execution_engine2.<method>` and return the first element of the result list
    async fn call<P: Serialize + Send, R: DeserializeOwned>(&self, method: &str, params: P) -> Result<R, ClientError> {
        let method = format!("{SERVICE}.{method}");
        let body = RpcRequest {
            version: "1.1",
            method: method.clone(),
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed).to_string(),
        };
        debug!("Calling {} at {}", method, self.endpoint);

        let response = self.client
            .post(self.endpoint.clone())
            .header(reqwest::header::AUTHORIZATION, self.token.as_str())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        // errors come back as HTTP 500 with a JSON-RPC error body, so parse before checking status
        let parsed: Option<RpcResponse> = serde_json::from_str(&text).ok();
        decode_response(&method, status.as_u16(), &text, parsed)
    }
}

fn decode_response<R: DeserializeOwned>(method: &str, status: u16, text: &str, parsed: Option<RpcResponse>) -> Result<R, ClientError> {
    let malformed = |message: String| ClientError::Malformed { method: method.to_string(), message };

    match parsed {
        Some(RpcResponse { error: Some(err), .. }) => Err(ClientError::Rpc {
            method: method.to_string(),
            name: err.name,
            message: err.message,
        }),
        Some(RpcResponse { result: Some(Value::Array(mut values)), .. }) if (200..300).contains(&status) => {
            if values.is_empty() {
                return Err(malformed("empty result list".to_string()));
            }
            serde_json::from_value(values.swap_remove(0)).map_err(|err| malformed(err.to_string()))
        }
        _ if !(200..300).contains(&status) => Err(ClientError::Http { status, body: text.to_string() }),
        _ => Err(malformed("response has neither a result list nor an error".to_string())),
    }
}

#[async_trait]
impl JobClient for Ee2Client {
    async fn submit(&self, request: &JobRequest) -> Result<JobId, ClientError> {
        let job_id: JobId = self.call("run_job", [request]).await?;
        info!("Execution engine accepted {} job {}", request.kind(), job_id);
        Ok(job_id)
    }

    async fn query_statuses(&self, ids: &[JobId]) -> Result<HashMap<JobId, JobStatus>, ClientError> {
        let result: CheckJobsResult = self.call("check_jobs", [json!({ "job_ids": ids })]).await?;
        let statuses = result.job_states
            .into_iter()
            .map(|state| {
                let status = state.job_status();
                (state.job_id, status)
            })
            .collect();
        Ok(statuses)
    }
}
