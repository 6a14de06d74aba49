//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and exit code 1 for every failure.

use std::fmt;
use std::process;

use tileforge::config::ConfigFileError;
use tileforge::scheduler::SchedulerError;
use tileforge::strategy::{FailureKind, ProductionError};

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(std::io::Error),
    /// Configuration error
    Config(ConfigFileError),
    /// Failed to create the HTTP client
    HttpClient(ProductionError),
    /// Scheduler error
    Scheduler(SchedulerError),
    /// The tile could not be produced
    Production { kind: FailureKind, detail: String },
    /// The scheduler stopped before delivering
    NoDelivery,
    /// Failed to write output file
    FileWrite { path: String, error: image::ImageError },
}

impl CliError {
    /// Exit the process with an error message and code 1.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Production {
            kind: FailureKind::UnreachableSource,
            ..
        } = self
        {
            eprintln!();
            eprintln!("The tile server could not be reached. Check the network connection");
            eprintln!("and the [remote] host in the configuration file.");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::HttpClient(e) => write!(f, "Failed to create HTTP client: {}", e),
            CliError::Scheduler(e) => write!(f, "Scheduler error: {}", e),
            CliError::Production { kind, detail } => {
                write!(f, "Tile production failed ({}): {}", kind, detail)
            }
            CliError::NoDelivery => write!(f, "Scheduler stopped before the tile was delivered"),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path, error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::LoggingInit(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::HttpClient(e) => Some(e),
            CliError::Scheduler(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<SchedulerError> for CliError {
    fn from(e: SchedulerError) -> Self {
        CliError::Scheduler(e)
    }
}
