//! Command line interface for appify.
//!
//! Parses arguments, checks for the disk image tool, runs the bundler and
//! reports the produced artifacts.

mod args;
mod output;

pub use args::Args;
pub use output::OutputManager;

use crate::bundler::{Bundler, Hdiutil, PackageType};
use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute(args).await
}

/// Runs one bundling job described by `args`; returns the process exit code.
pub async fn execute(args: Args) -> Result<i32> {
    args.validate()?;

    let output = OutputManager::new(args.quiet);
    let config = args.bundle_config()?;
    let package_types = args.package_types();

    let tool = if package_types.contains(&PackageType::Dmg) {
        Hdiutil::locate()?
    } else {
        Hdiutil::new()
    };

    output.info(&format!(
        "Bundling {} as {}",
        args.executable.display(),
        config.app_dir_name()
    ))?;

    let artifacts = Bundler::with_tool(config, tool)
        .output_dir(&args.output_dir)
        .package_types(package_types)
        .bundle(&args.executable)
        .await?;

    for artifact in &artifacts {
        for path in &artifact.paths {
            output.success(&format!("Created {}: {}", artifact.package_type, path.display()))?;
        }
        output.indent(&format!("size: {} bytes", artifact.size))?;
        output.indent(&format!("sha256: {}", artifact.checksum))?;
    }

    Ok(0)
}
