//! Top-level error types for appify.
//!
//! Wraps bundler failures and CLI validation failures, and maps each to
//! actionable recovery suggestions.

use crate::bundler::Error as BundlerError;
use thiserror::Error;

/// Result type alias for appify operations
pub type Result<T> = std::result::Result<T, AppifyError>;

/// Main error type for all appify operations
#[derive(Error, Debug)]
pub enum AppifyError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// Bundler errors
    #[error("{0}")]
    Bundler(#[from] BundlerError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Command line interface errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Missing required argument
    #[error("Missing required argument: {argument}")]
    MissingArgument {
        /// Argument name
        argument: String,
    },
}

impl AppifyError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        let AppifyError::Bundler(error) = self else {
            return match self {
                AppifyError::Cli(_) => vec!["Run `appify --help` for usage".to_string()],
                _ => vec!["Check the error message above for specific details".to_string()],
            };
        };

        match error.root_cause() {
            BundlerError::ToolNotFound { tool, .. } => vec![
                format!("`{tool}` ships with macOS; disk images can only be built on a Mac"),
                "Use --no-dmg to build only the .app bundle".to_string(),
            ],
            BundlerError::NotFound {
                what: "executable",
                path,
            } => vec![
                format!("Check that {} exists and is readable", path.display()),
                "Build the executable before bundling it".to_string(),
            ],
            BundlerError::NotFound { path, .. } => {
                vec![format!("Check the path {}", path.display())]
            }
            BundlerError::UnsupportedFormat { .. } => vec![
                "Provide the icon as .icns, .png, .jpg, .jpeg or .gif".to_string(),
            ],
            BundlerError::ConversionFailed { .. } => vec![
                "Check that the icon file is a valid, uncorrupted image".to_string(),
                "Convert the icon to .icns with iconutil and pass that instead".to_string(),
            ],
            BundlerError::DestinationExists { path } => vec![format!(
                "Remove {} and run again",
                path.display()
            )],
            BundlerError::ExternalToolFailed { .. } | BundlerError::NoDeviceReturned => vec![
                "Check for stale mounts with `hdiutil info` and detach them".to_string(),
                "Make sure the output directory has enough free space".to_string(),
            ],
            BundlerError::InvalidConfig(_) => {
                vec!["Run `appify --help` for valid option values".to_string()]
            }
            BundlerError::Fs { error, .. }
                if error.kind() == std::io::ErrorKind::PermissionDenied =>
            {
                vec!["Check write permissions on the output directory".to_string()]
            }
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}
