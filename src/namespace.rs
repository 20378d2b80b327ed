use std::fmt;
use clap::ValueEnum;

/// Deployment of the execution service that jobs are submitted to
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum PlatformNamespace {
    Dev,
    Test,
    Prod
}

impl PlatformNamespace {
    /// Default execution engine endpoint for each deployment
    pub fn endpoint(&self) -> &'static str {
        match self {
            PlatformNamespace::Dev => "https://ci.kbase.us/services/ee2",
            PlatformNamespace::Test => "https://appdev.kbase.us/services/ee2",
            PlatformNamespace::Prod => "https://kbase.us/services/ee2"
        }
    }
}

impl fmt::Display for PlatformNamespace {
      fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PlatformNamespace::Dev => write!(f, "dev"),
            PlatformNamespace::Test => write!(f, "test"),
            PlatformNamespace::Prod => write!(f, "prod")
        }
    }
}
