//! Command line argument parsing and validation.
//!
//! One positional executable plus options describing the bundle. Missing or
//! malformed arguments are reported by clap with exit status 2.

use crate::bundler::{
    BundleConfig, BundleMode, DEFAULT_AUTHOR, DEFAULT_NAME, DEFAULT_VERSION, PackageType,
};
use crate::error::CliError;
use clap::Parser;
use std::path::PathBuf;

/// Wrap an executable into a macOS .app bundle and .dmg disk image
#[derive(Parser, Debug, Clone)]
#[command(
    name = "appify",
    disable_version_flag = true,
    about = "Wrap an executable into a macOS .app bundle and .dmg disk image",
    long_about = "Create a macOS application bundle around a standalone executable,
then package it into a compressed disk image with hdiutil.

Usage:
  appify ./myserver
  appify --name \"My App\" --icon logo.png ./myserver
  appify --mode tray --no-dmg ./menubar-helper"
)]
pub struct Args {
    /// Path to the executable to bundle
    #[arg(index = 1, value_name = "EXECUTABLE")]
    pub executable: PathBuf,

    /// Application name
    #[arg(long, default_value = DEFAULT_NAME)]
    pub name: String,

    /// Author credited in the bundle's info string
    #[arg(long, default_value = DEFAULT_AUTHOR)]
    pub author: String,

    /// Application version
    #[arg(long, default_value = DEFAULT_VERSION)]
    pub version: String,

    /// Bundle identifier (default: <author>.<name>)
    #[arg(long, value_name = "IDENTIFIER")]
    pub id: Option<String>,

    /// Icon file (.icns, .png, .jpg, .jpeg or .gif)
    #[arg(long, value_name = "FILE")]
    pub icon: Option<PathBuf>,

    /// Launch mode: `normal`, or `tray` for no dock icon or menu bar
    #[arg(long, default_value = "normal", value_name = "MODE")]
    pub mode: BundleMode,

    /// Directory receiving the .app and .dmg
    #[arg(long, default_value = ".", value_name = "DIR", env = "APPIFY_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Build only the .app bundle
    #[arg(long)]
    pub no_dmg: bool,

    /// Suppress progress output (errors are still printed)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), CliError> {
        if self.executable.as_os_str().is_empty() {
            return Err(CliError::MissingArgument {
                argument: "EXECUTABLE".to_string(),
            });
        }
        if let Some(icon) = &self.icon
            && icon.as_os_str().is_empty()
        {
            return Err(CliError::InvalidArguments {
                reason: "--icon must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Bundle configuration described by these arguments.
    pub fn bundle_config(&self) -> crate::bundler::Result<BundleConfig> {
        let mut builder = BundleConfig::builder()
            .name(&self.name)
            .author(&self.author)
            .version(&self.version)
            .mode(self.mode);
        if let Some(id) = &self.id {
            builder = builder.identifier(id);
        }
        if let Some(icon) = &self.icon {
            builder = builder.icon(icon);
        }
        builder.build()
    }

    /// Artifacts to produce.
    pub fn package_types(&self) -> Vec<PackageType> {
        if self.no_dmg {
            vec![PackageType::MacOsBundle]
        } else {
            PackageType::all()
        }
    }
}
