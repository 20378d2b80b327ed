use log::{info, warn};

use crate::config::Config;
use crate::ee2::client::JobClient;
use crate::ee2::job_request::JobRequest;
use crate::pipeline::report::JobOutcome;
use crate::pipeline::submission::{submit, SubmissionError};
use crate::request::schema::PayloadSchemas;

/// Submit a SPAdes assembly of the reads object at `reads_ref`
///
/// Fire and forget: the assembly job id is recorded in the outcome but never polled. A failure
/// is logged and reported in the outcome, it never stops the pipeline.
pub async fn submit_assembly<C: JobClient>(client: &C, schemas: &PayloadSchemas, config: &Config, reads_ref: &str, name: &str) -> JobOutcome {
    info!("About to assemble {} ({})", name, reads_ref);

    let result = match JobRequest::assemble_reads(reads_ref, name, config) {
        Ok(request) => submit(client, schemas, &request).await,
        Err(err) => {
            warn!("Can't build assembly request for {}: {}", name, err);
            Err(SubmissionError::from(err))
        }
    };

    match result {
        Ok(assembly_job_id) => JobOutcome::Assembled { reads_ref: reads_ref.to_string(), assembly_job_id },
        Err(err) => JobOutcome::AssemblyRejected { reads_ref: reads_ref.to_string(), reason: err.to_string() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::ee2::job_request::JobId;
    use crate::pipeline::testing::ScriptedClient;

    #[tokio::test]
    async fn assembly_output_is_named_after_upload() {
        let client = ScriptedClient::new();
        let schemas = PayloadSchemas::load().unwrap();

        let outcome = submit_assembly(&client, &schemas, &test_config(), "ws/1/1", "A").await;

        assert_eq!(outcome, JobOutcome::Assembled { reads_ref: "ws/1/1".to_string(), assembly_job_id: JobId::from("assembly-A.out") });
        let submitted = client.assemblies();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].output_contigset_name, "A.out");
        assert_eq!(submitted[0].read_libraries, vec!["ws/1/1".to_string()]);
        assert_eq!(submitted[0].min_contig_length, 500);
        assert!(submitted[0].kmer_sizes.is_empty());
        assert!(!submitted[0].skip_error_correction);
    }

    #[tokio::test]
    async fn rejection_is_reported_not_raised() {
        let client = ScriptedClient::new().reject_assemblies();
        let schemas = PayloadSchemas::load().unwrap();

        let outcome = submit_assembly(&client, &schemas, &test_config(), "ws/1/1", "A").await;

        assert!(matches!(outcome, JobOutcome::AssemblyRejected { ref reads_ref, .. } if reads_ref == "ws/1/1"));
    }

    #[tokio::test]
    async fn broken_output_template_is_reported() {
        let client = ScriptedClient::new();
        let schemas = PayloadSchemas::load().unwrap();
        let mut config = test_config();
        config.output_template = "{missing}".to_string();

        let outcome = submit_assembly(&client, &schemas, &config, "ws/1/1", "A").await;

        assert!(matches!(outcome, JobOutcome::AssemblyRejected { .. }));
        assert!(client.submitted().is_empty());
    }
}
