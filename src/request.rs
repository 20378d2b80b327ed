//! Uploads are read from a delimited table and turned into typed records

/// Typed upload records
pub mod upload;

/// Read the upload table
pub mod table;

/// Check job parameter payloads against JSON schema before submission
pub mod schema;
