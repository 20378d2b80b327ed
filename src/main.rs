use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::{AppPin, Config, ASSEMBLY_SERVICE_VER, DEFAULT_OUTPUT_TEMPLATE, IMPORT_SERVICE_VER};
use crate::ee2::client::Ee2Client;
use crate::ee2::job_request::JobRequest;
use crate::namespace::PlatformNamespace;
use crate::pipeline::coordinator::Coordinator;
use crate::pipeline::import::submit_imports;
use crate::pipeline::report::BatchReport;
use crate::request::schema::PayloadSchemas;
use crate::request::table::UploadTable;
use crate::request::upload::UploadSpec;

mod config;
mod ee2;
mod namespace;
mod pipeline;
mod request;

#[derive(Parser, Debug)]
#[command(name = "readsubmit")]
#[command(about = "Import staged sequencing reads and assemble each import with SPAdes", long_about = None)]
struct Cli {
    /// Delimited upload table with forward_file, reverse_file and name columns
    #[arg(short, long)]
    input: PathBuf,

    /// Column delimiter of the upload table
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Deployment to submit jobs to
    #[arg(short, long, value_enum, default_value_t = PlatformNamespace::Prod)]
    namespace: PlatformNamespace,

    /// Execution engine URL, overrides the namespace default
    #[arg(long, env = "EE2_URL")]
    endpoint: Option<Url>,

    #[arg(long, env = "KB_AUTH_TOKEN", hide_env_values = true)]
    token: String,

    /// Numeric id of the target workspace
    #[arg(long, env = "KB_WORKSPACE_ID")]
    workspace_id: u64,

    /// Name of the target workspace, e.g. user:narrative_1598898899343
    #[arg(long, env = "KB_WORKSPACE_NAME")]
    workspace_name: String,

    #[arg(long, default_value = IMPORT_SERVICE_VER)]
    import_service_ver: String,

    #[arg(long, default_value = ASSEMBLY_SERVICE_VER)]
    assembly_service_ver: String,

    /// Seconds between job status checks
    #[arg(long, default_value_t = 10)]
    poll_interval: u64,

    /// Stop waiting on import jobs after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Name of each assembly output, {name} is the upload name
    #[arg(long, default_value = DEFAULT_OUTPUT_TEMPLATE)]
    output_template: String,

    /// Write a JSON report of every upload's outcome to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Read and validate the upload table without submitting anything
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn config(&self) -> anyhow::Result<Config> {
        let endpoint = match &self.endpoint {
            Some(url) => url.clone(),
            None => {
                info!("Using {} execution engine", self.namespace);
                Url::parse(self.namespace.endpoint())?
            }
        };

        Ok(Config {
            endpoint,
            token: self.token.clone(),
            workspace_id: self.workspace_id,
            workspace_name: self.workspace_name.clone(),
            import_app: AppPin::import(&self.import_service_ver),
            assembly_app: AppPin::assembly(&self.assembly_service_ver),
            poll_interval: Duration::from_secs(self.poll_interval),
            deadline: self.timeout.map(Duration::from_secs),
            output_template: self.output_template.clone(),
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("terve! starting up :)");

    let cli = Cli::parse();
    let config = cli.config()?;
    config.validate().context("Invalid configuration")?;
    info!("{:?}", config);

    let schemas = PayloadSchemas::load()?;
    let table = UploadTable {
        path: cli.input.clone(),
        delimiter: cli.delimiter,
        workspace: config.workspace_name.clone(),
    };
    let uploads = table.read().context("Can't load uploads")?;

    if cli.dry_run {
        info!("--dry-run set, validating requests without submitting");
        return Ok(dry_run(&uploads, &schemas, &config));
    }

    let started_at = Utc::now();
    let client = Ee2Client::new(&config);
    let batch = submit_imports(&client, &schemas, &config, &uploads).await;

    if !batch.is_complete(uploads.len()) {
        error!("Something went wrong. Expected {} import jobs but only got {}", uploads.len(), batch.job_ids.len());
        let report = BatchReport::new(started_at, batch.rejected);
        if let Some(path) = &cli.report {
            report.write(path)?;
        }
        return Ok(ExitCode::FAILURE);
    }

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, no more status checks will be made");
            shutdown.cancel();
        }
    });

    let jobs = Coordinator::new(&client, &schemas, &config)
        .run(batch.job_ids, batch.pending, &cancel)
        .await;

    let report = BatchReport::new(started_at, jobs);
    report.log_summary();
    if let Some(path) = &cli.report {
        report.write(path)?;
    }

    Ok(ExitCode::SUCCESS)
}

/// Build and validate every import request, logging the payloads
fn dry_run(uploads: &[UploadSpec], schemas: &PayloadSchemas, config: &Config) -> ExitCode {
    let mut invalid = 0;
    for upload in uploads {
        let request = JobRequest::import_reads(upload, config);
        match schemas.validate(&request) {
            Ok(_) => match serde_json::to_string_pretty(&request) {
                Ok(payload) => info!("{} would be submitted as:\n{}", upload.name, payload),
                Err(err) => warn!("Can't render request for {}: {}", upload.name, err),
            },
            Err(err) => {
                warn!("{}: {}", upload.name, err);
                invalid += 1;
            }
        }
    }

    info!("{} of {} uploads are valid", uploads.len() - invalid, uploads.len());
    match invalid {
        0 => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}
