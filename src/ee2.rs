//! Client side of the execution engine that runs import and assembly jobs

/// Typed job submissions and the job states the service reports back
pub mod job_request;

/// Submit jobs and query their status over JSON-RPC
pub mod client;
