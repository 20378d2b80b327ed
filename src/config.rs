//! Runtime configuration, built once at startup and passed by reference to every component

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tinytemplate::TinyTemplate;
use url::Url;

pub static IMPORT_APP_ID: &str = "kb_uploadmethods/import_fastq_sra_as_reads_from_staging";
pub static IMPORT_METHOD: &str = "kb_uploadmethods.import_reads_from_staging";
pub static IMPORT_SERVICE_VER: &str = "d42c2a16cc670db70e8a04e0a2b15b69baec7b22";

pub static ASSEMBLY_APP_ID: &str = "kb_SPAdes/run_SPAdes";
pub static ASSEMBLY_METHOD: &str = "kb_SPAdes.run_SPAdes";
pub static ASSEMBLY_SERVICE_VER: &str = "c16af2daf290cf629c3c52e5b03d367158dac32f";

pub static RELEASE_TAG: &str = "release";
pub static DEFAULT_OUTPUT_TEMPLATE: &str = "{name}.out";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("auth token is empty")]
    MissingToken,
    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,
    #[error("endpoint {0} is not an http(s) URL")]
    UnsupportedEndpoint(Url),
    #[error("workspace name is empty")]
    MissingWorkspaceName,
    #[error("invalid output name template: {0}")]
    Template(String),
}

/// A versioned reference to an app on the execution service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPin {
    pub app_id: String,
    pub method: String,
    pub service_ver: String,
    pub tag: String,
}

impl AppPin {
    pub fn import(service_ver: &str) -> AppPin {
        AppPin {
            app_id: IMPORT_APP_ID.to_string(),
            method: IMPORT_METHOD.to_string(),
            service_ver: service_ver.to_string(),
            tag: RELEASE_TAG.to_string(),
        }
    }

    pub fn assembly(service_ver: &str) -> AppPin {
        AppPin {
            app_id: ASSEMBLY_APP_ID.to_string(),
            method: ASSEMBLY_METHOD.to_string(),
            service_ver: service_ver.to_string(),
            tag: RELEASE_TAG.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub endpoint: Url,
    pub token: String,
    /// Numeric workspace id used when submitting jobs
    pub workspace_id: u64,
    /// Workspace display name that import and assembly apps write objects into
    pub workspace_name: String,
    pub import_app: AppPin,
    pub assembly_app: AppPin,
    pub poll_interval: Duration,
    /// Upper bound on how long the coordinator polls before giving up on unresolved jobs
    pub deadline: Option<Duration>,
    pub output_template: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint.as_str())
            .field("token", &"<redacted>")
            .field("workspace_id", &self.workspace_id)
            .field("workspace_name", &self.workspace_name)
            .field("import_app", &self.import_app)
            .field("assembly_app", &self.assembly_app)
            .field("poll_interval", &self.poll_interval)
            .field("deadline", &self.deadline)
            .field("output_template", &self.output_template)
            .finish()
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        if self.workspace_name.trim().is_empty() {
            return Err(ConfigError::MissingWorkspaceName);
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        match self.endpoint.scheme() {
            "http" | "https" => {}
            _ => return Err(ConfigError::UnsupportedEndpoint(self.endpoint.clone())),
        }
        let rendered = self.output_name("reads")?;
        if rendered.trim().is_empty() {
            return Err(ConfigError::Template("template renders to an empty name".to_string()));
        }
        Ok(())
    }

    /// Name of the contig set produced by assembling the reads object called `name`
    pub fn output_name(&self, name: &str) -> Result<String, ConfigError> {
        render_output_name(&self.output_template, name)
    }
}

/// Rendering context for the assembly output name
#[derive(Serialize)]
struct OutputNameContext<'a> {
    name: &'a str,
}

/// Render the assembly output name using TinyTemplate
fn render_output_name(template: &str, name: &str) -> Result<String, ConfigError> {
    let mut tt = TinyTemplate::new();
    // object names are not HTML
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template("output", template)
        .map_err(|err| ConfigError::Template(err.to_string()))?;
    tt.render("output", &OutputNameContext { name })
        .map_err(|err| ConfigError::Template(err.to_string()))
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        endpoint: Url::parse("http://localhost:5000/services/ee2").unwrap(),
        token: "secret-token".to_string(),
        workspace_id: 71011,
        workspace_name: "user:narrative_1598898899343".to_string(),
        import_app: AppPin::import(IMPORT_SERVICE_VER),
        assembly_app: AppPin::assembly(ASSEMBLY_SERVICE_VER),
        poll_interval: Duration::from_millis(1),
        deadline: None,
        output_template: DEFAULT_OUTPUT_TEMPLATE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_appends_out() {
        let config = test_config();
        assert_eq!(config.output_name("A").unwrap(), "A.out");
    }

    #[test]
    fn output_name_is_not_html_escaped() {
        let mut config = test_config();
        config.output_template = "{name}_spades&contigs".to_string();
        assert_eq!(config.output_name("a<b").unwrap(), "a<b_spades&contigs");
    }

    #[test]
    fn validate_accepts_test_config() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = test_config();
        config.token = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::MissingToken)));

        let mut config = test_config();
        config.poll_interval = Duration::ZERO;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroPollInterval)));

        let mut config = test_config();
        config.endpoint = Url::parse("ftp://example.org/ee2").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::UnsupportedEndpoint(_))));

        let mut config = test_config();
        config.output_template = "{unknown}".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Template(_))));
    }

    #[test]
    fn debug_output_hides_token() {
        let printed = format!("{:?}", test_config());
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("<redacted>"));
    }
}
