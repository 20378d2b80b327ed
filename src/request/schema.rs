use jsonschema::JSONSchema;
use log::{debug, warn};
use serde_json::Value;

use crate::ee2::job_request::JobRequest;

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("can't serialise job parameters: {0}")]
    Serialise(#[from] serde_json::Error),
    #[error("embedded schema {name} is invalid: {message}")]
    Schema { name: &'static str, message: String },
    #[error("{kind} parameters fail validation: {}", .errors.join("; "))]
    Invalid { kind: &'static str, errors: Vec<String> },
}

/// Compiled JSON schemas for the parameter object of every job kind
pub struct PayloadSchemas {
    import: JSONSchema,
    assembly: JSONSchema,
}

impl PayloadSchemas {
    pub fn load() -> Result<PayloadSchemas, RequestError> {
        /// included import_reads_from_staging schema
        static IMPORT: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/schema/import_reads.json"));
        /// included run_SPAdes schema
        static ASSEMBLY: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/schema/run_spades.json"));

        Ok(PayloadSchemas {
            import: compile_schema("import_reads.json", IMPORT)?,
            assembly: compile_schema("run_spades.json", ASSEMBLY)?,
        })
    }

    /// Check a request's parameter object before it is sent to the service
    pub fn validate(&self, request: &JobRequest) -> Result<(), RequestError> {
        let params: Value = request.app_params_json()?;
        let schema = match request {
            JobRequest::ImportReads(_) => &self.import,
            JobRequest::AssembleReads(_) => &self.assembly,
        };

        debug!("Validating {} parameters against JSON schema", request.kind());
        let result = schema.validate(&params).map_err(|errors| {
            errors
                .map(|err| format!("{} (at '{}')", err, err.instance_path))
                .collect::<Vec<String>>()
        });

        match result {
            Ok(_) => Ok(()),
            Err(errors) => {
                warn!("{} parameters fail validation", request.kind());
                Err(RequestError::Invalid { kind: request.kind(), errors })
            }
        }
    }
}

fn compile_schema(name: &'static str, text: &str) -> Result<JSONSchema, RequestError> {
    let schema: Value = serde_json::from_str(text)?;
    JSONSchema::compile(&schema)
        .map_err(|err| RequestError::Schema { name, message: err.to_string() })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::test_config;
    use crate::request::upload::{ImportType, UploadSpec};

    fn upload(name: &str) -> UploadSpec {
        UploadSpec::new(PathBuf::from("a_1.fq"), Some(PathBuf::from("a_2.fq")), name.to_string(), "ws".to_string())
    }

    #[test]
    fn embedded_schemas_compile() {
        assert!(PayloadSchemas::load().is_ok());
    }

    #[test]
    fn well_formed_requests_pass() {
        let schemas = PayloadSchemas::load().unwrap();
        let config = test_config();

        let import = JobRequest::import_reads(&upload("sample_1.reads"), &config);
        assert!(schemas.validate(&import).is_ok());

        let assembly = JobRequest::assemble_reads("ws/1/1", "sample_1.reads", &config).unwrap();
        assert!(schemas.validate(&assembly).is_ok());
    }

    #[test]
    fn object_names_with_spaces_are_rejected() {
        let schemas = PayloadSchemas::load().unwrap();
        let request = JobRequest::import_reads(&upload("my reads"), &test_config());
        match schemas.validate(&request) {
            Err(RequestError::Invalid { kind, errors }) => {
                assert_eq!(kind, "import");
                assert!(errors.iter().any(|e| e.contains("/name")), "{errors:?}");
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn sra_import_needs_sra_file() {
        let schemas = PayloadSchemas::load().unwrap();
        let config = test_config();

        let mut sra = upload("A");
        sra.import_type = ImportType::Sra;
        let request = JobRequest::import_reads(&sra, &config);
        assert!(matches!(schemas.validate(&request), Err(RequestError::Invalid { .. })));

        sra.sra_file = Some(PathBuf::from("SRR000001.sra"));
        let request = JobRequest::import_reads(&sra, &config);
        assert!(schemas.validate(&request).is_ok());
    }

    #[test]
    fn assembly_needs_a_reads_reference() {
        let schemas = PayloadSchemas::load().unwrap();
        let request = JobRequest::assemble_reads("not a ref", "A", &test_config()).unwrap();
        assert!(matches!(schemas.validate(&request), Err(RequestError::Invalid { kind: "assembly", .. })));
    }
}
