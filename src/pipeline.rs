//! Two stage pipeline: import staged reads, then assemble every import that completes

/// Submit an import job for every upload
pub mod import;

/// Submit the follow-on assembly job for a completed import
pub mod assembly;

/// Poll import jobs until they resolve
pub mod coordinator;

/// Per-upload outcomes
pub mod report;

pub mod submission;

#[cfg(test)]
pub(crate) mod testing;
