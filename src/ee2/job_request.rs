use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::config::{AppPin, Config, ConfigError};
use crate::request::upload::{ImportType, SequencingTech, UploadSpec};

/// Handle for a job on the execution service
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        JobId(id.to_string())
    }
}

/// Parameters of a `run_job` call
///
/// `params` always holds exactly one entry: the app's own parameter object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunJob<P> {
    pub app_id: String,
    pub method: String,
    pub service_ver: String,
    pub tag: String,
    pub wsid: u64,
    pub source_ws_objects: Vec<String>,
    pub params: [P; 1],
}

impl<P> RunJob<P> {
    fn new(app: &AppPin, wsid: u64, source_ws_objects: Vec<String>, params: P) -> RunJob<P> {
        RunJob {
            app_id: app.app_id.clone(),
            method: app.method.clone(),
            service_ver: app.service_ver.clone(),
            tag: app.tag.clone(),
            wsid,
            source_ws_objects,
            params: [params],
        }
    }

    pub fn app_params(&self) -> &P {
        &self.params[0]
    }
}

/// A job submission, one variant per kind of job this tool runs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JobRequest {
    ImportReads(RunJob<ImportReadsParams>),
    AssembleReads(RunJob<SpadesParams>),
}

impl JobRequest {
    /// Import staged files into a reads object
    pub fn import_reads(upload: &UploadSpec, config: &Config) -> JobRequest {
        let params = ImportReadsParams::from(upload);
        JobRequest::ImportReads(RunJob::new(&config.import_app, config.workspace_id, Vec::new(), params))
    }

    /// Assemble the reads object at `reads_ref` with SPAdes
    pub fn assemble_reads(reads_ref: &str, name: &str, config: &Config) -> Result<JobRequest, ConfigError> {
        let params = SpadesParams {
            dna_source: "standard".to_string(),
            kmer_sizes: Vec::new(),
            min_contig_length: 500,
            output_contigset_name: config.output_name(name)?,
            read_libraries: vec![reads_ref.to_string()],
            skip_error_correction: false,
            workspace_name: config.workspace_name.clone(),
        };
        let sources = vec![reads_ref.to_string()];
        Ok(JobRequest::AssembleReads(RunJob::new(&config.assembly_app, config.workspace_id, sources, params)))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            JobRequest::ImportReads(_) => "import",
            JobRequest::AssembleReads(_) => "assembly",
        }
    }

    pub fn method(&self) -> &str {
        match self {
            JobRequest::ImportReads(job) => &job.method,
            JobRequest::AssembleReads(job) => &job.method,
        }
    }

    /// The app's parameter object as JSON, the part checked against the payload schema
    pub fn app_params_json(&self) -> serde_json::Result<Value> {
        match self {
            JobRequest::ImportReads(job) => serde_json::to_value(job.app_params()),
            JobRequest::AssembleReads(job) => serde_json::to_value(job.app_params()),
        }
    }
}

/// Parameters of `import_reads_from_staging`, the wire form of an [`UploadSpec`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReadsParams {
    pub fastq_fwd_staging_file_name: String,
    pub fastq_rev_staging_file_name: String,
    pub name: String,
    pub workspace_name: String,
    pub sequencing_tech: SequencingTech,
    pub import_type: ImportType,
    pub insert_size_mean: Option<i64>,
    pub insert_size_std_dev: Option<i64>,
    #[serde(serialize_with = "as_flag")]
    pub interleaved: bool,
    #[serde(serialize_with = "as_flag")]
    pub read_orientation_outward: bool,
    #[serde(serialize_with = "as_flag")]
    pub single_genome: bool,
    pub sra_staging_file_name: String,
}

impl From<&UploadSpec> for ImportReadsParams {
    fn from(upload: &UploadSpec) -> Self {
        ImportReadsParams {
            fastq_fwd_staging_file_name: staging_path(Some(&upload.forward_file)),
            fastq_rev_staging_file_name: staging_path(upload.reverse_file.as_deref()),
            name: upload.name.clone(),
            workspace_name: upload.workspace.clone(),
            sequencing_tech: upload.sequencing_tech,
            import_type: upload.import_type,
            insert_size_mean: upload.insert_size_mean,
            insert_size_std_dev: upload.insert_size_std_dev,
            interleaved: upload.interleaved,
            read_orientation_outward: upload.read_orientation_outward,
            single_genome: upload.single_genome,
            sra_staging_file_name: staging_path(upload.sra_file.as_deref()),
        }
    }
}

/// Staging paths are relative strings on the wire, missing files are empty strings
fn staging_path(path: Option<&Path>) -> String {
    path.map(|p| p.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Parameters of `run_SPAdes`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpadesParams {
    pub dna_source: String,
    pub kmer_sizes: Vec<u32>,
    pub min_contig_length: u32,
    pub output_contigset_name: String,
    pub read_libraries: Vec<String>,
    #[serde(serialize_with = "as_flag")]
    pub skip_error_correction: bool,
    pub workspace_name: String,
}

/// The service takes booleans as 0/1 integers
fn as_flag<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}

/// Status of a job as reported by `check_jobs`
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Queued,
    Running,
    Completed { output: Option<JobOutput> },
    Terminated,
    Error { message: Option<String> },
    /// A status string this client doesn't know, polled again like a running job
    Other(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed { .. } | JobStatus::Terminated | JobStatus::Error { .. })
    }
}

/// `job_output` of a finished job
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobOutput {
    #[serde(default)]
    pub result: Vec<Value>,
}

impl JobOutput {
    /// Object reference of the first result entry
    pub fn object_ref(&self) -> Option<&str> {
        self.result.first()?.get("obj_ref")?.as_str()
    }
}

/// One entry of the `job_states` list returned by `check_jobs`
#[derive(Debug, Clone, Deserialize)]
pub struct JobState {
    pub job_id: JobId,
    pub status: String,
    #[serde(default)]
    pub job_output: Option<JobOutput>,
    #[serde(default)]
    pub errormsg: Option<String>,
}

impl JobState {
    pub fn job_status(&self) -> JobStatus {
        match self.status.as_str() {
            "created" | "queued" | "estimating" => JobStatus::Queued,
            "running" => JobStatus::Running,
            "completed" => JobStatus::Completed { output: self.job_output.clone() },
            "terminated" => JobStatus::Terminated,
            "error" => JobStatus::Error { message: self.errormsg.clone() },
            other => JobStatus::Other(other.to_string()),
        }
    }
}
