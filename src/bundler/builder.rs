//! Bundle orchestration and coordination.
//!
//! This module provides the main [`Bundler`] orchestrator that turns a
//! [`BundleConfig`] and an executable into the requested artifacts.
//!
//! # Overview
//!
//! The bundler:
//! 1. Assembles the `.app` bundle in the output directory
//! 2. Builds the `.dmg` from it when requested
//! 3. Calculates sizes and checksums
//! 4. Returns [`BundledArtifact`] results
//!
//! # Example
//!
//! ```no_run
//! use appify::bundler::{BundleConfig, Bundler};
//! use std::path::Path;
//!
//! # async fn example() -> appify::bundler::Result<()> {
//! let config = BundleConfig::builder().name("MyApp").author("Example").build()?;
//!
//! let bundler = Bundler::new(config).output_dir("dist");
//! let artifacts = bundler.bundle(Path::new("target/release/myapp")).await?;
//!
//! for artifact in artifacts {
//!     println!("Created: {} ({} bytes)", artifact.package_type, artifact.size);
//!     println!("SHA256: {}", artifact.checksum);
//! }
//! # Ok(())
//! # }
//! ```

use crate::bail;
use crate::bundler::{
    BundledArtifact, PackageType, Result,
    error::{Context, Error, ErrorExt},
    platform::macos::{app, dmg, hdiutil::DiskImageTool, hdiutil::Hdiutil},
    settings::BundleConfig,
    utils::fs,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Main bundler orchestrator.
///
/// Generic over the disk image tool so the DMG pipeline can run against a
/// stand-in; [`Bundler::new`] uses the real `hdiutil`.
pub struct Bundler<T = Hdiutil> {
    config: BundleConfig,
    output_dir: PathBuf,
    package_types: Vec<PackageType>,
    tool: Arc<T>,
}

impl<T> std::fmt::Debug for Bundler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bundler")
            .field("config", &self.config)
            .field("output_dir", &self.output_dir)
            .field("package_types", &self.package_types)
            .finish_non_exhaustive()
    }
}

impl Bundler<Hdiutil> {
    /// Creates a bundler that writes to the current directory, builds every
    /// package type and resolves `hdiutil` through `PATH`.
    pub fn new(config: BundleConfig) -> Self {
        Self::with_tool(config, Hdiutil::new())
    }
}

impl<T> Bundler<T>
where
    T: DiskImageTool + Send + Sync + 'static,
{
    /// Creates a bundler that drives `tool` for the disk image phases.
    pub fn with_tool(config: BundleConfig, tool: T) -> Self {
        Self {
            config,
            output_dir: PathBuf::from("."),
            package_types: PackageType::all(),
            tool: Arc::new(tool),
        }
    }

    /// Sets the directory receiving the `.app` and `.dmg`.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Restricts which artifacts are produced.
    ///
    /// The bundle is always assembled when a DMG is requested, but only
    /// reported when [`PackageType::MacOsBundle`] is in the list.
    pub fn package_types(mut self, types: impl IntoIterator<Item = PackageType>) -> Self {
        let mut types: Vec<_> = types.into_iter().collect();
        types.sort_by_key(|t| t.priority());
        types.dedup();
        self.package_types = types;
        self
    }

    /// Returns the bundle configuration.
    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    /// Returns the requested package types in bundling order.
    pub fn requested_types(&self) -> &[PackageType] {
        &self.package_types
    }

    /// Packages `binary`, returning one [`BundledArtifact`] per requested type.
    ///
    /// # Errors
    ///
    /// The first failing step aborts the run. Each external tool call is made
    /// at most once.
    pub async fn bundle(&self, binary: &Path) -> Result<Vec<BundledArtifact>> {
        if self.package_types.is_empty() {
            bail!("no package types requested");
        }
        fs::create_dir_all(&self.output_dir, false)
            .await
            .context("failed to prepare output directory")?;

        let layout = app::assemble_bundle(&self.config, binary, &self.output_dir)
            .await
            .context("failed to assemble app bundle")?;

        let mut artifacts = Vec::new();
        for package_type in &self.package_types {
            let path = match package_type {
                PackageType::MacOsBundle => layout.bundle_root.clone(),
                PackageType::Dmg => self.build_dmg(&layout.bundle_root).await?,
            };

            let size = artifact_size(&path).await?;
            let checksum = calculate_sha256(&path).await?;
            log::debug!("{package_type} artifact {} ({size} bytes)", path.display());

            artifacts.push(BundledArtifact {
                package_type: *package_type,
                paths: vec![path],
                size,
                checksum,
            });
        }

        Ok(artifacts)
    }

    async fn build_dmg(&self, bundle_root: &Path) -> Result<PathBuf> {
        let tool = Arc::clone(&self.tool);
        let app_name = self.config.name().to_string();
        let bundle_root = bundle_root.to_path_buf();
        let output_dir = self.output_dir.clone();

        tokio::task::spawn_blocking(move || {
            dmg::build_disk_image(tool.as_ref(), &app_name, &bundle_root, &output_dir)
        })
        .await
        .map_err(|e| Error::GenericError(format!("disk image task failed: {e}")))?
        .context("failed to build disk image")
    }
}

/// Byte size of a file, or the total of all files below a directory.
async fn artifact_size(path: &Path) -> Result<u64> {
    let metadata = tokio::fs::metadata(path)
        .await
        .fs_context("reading artifact metadata", path)?;
    if metadata.is_dir() {
        fs::dir_footprint(path)
    } else {
        Ok(metadata.len())
    }
}

/// Calculates SHA256 checksum of a file or directory.
///
/// For files: Reads in 8KB chunks and computes the SHA-256 hash.
/// For directories: Recursively hashes all files in deterministic order.
async fn calculate_sha256(path: &Path) -> Result<String> {
    use sha2::{Digest, Sha256};
    use tokio::io::AsyncReadExt;

    let metadata = tokio::fs::metadata(path).await.map_err(Error::IoError)?;

    if metadata.is_file() {
        let mut file = tokio::fs::File::open(path).await.map_err(Error::IoError)?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; 8192];

        loop {
            let n = file.read(&mut buffer).await.map_err(Error::IoError)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    } else if metadata.is_dir() {
        calculate_directory_sha256(path).await
    } else {
        bail!("Path is neither file nor directory: {}", path.display())
    }
}

/// Calculates SHA256 checksum of a directory tree.
///
/// Each file contributes its relative path followed by its content, in
/// sorted path order, so the result does not depend on traversal order.
async fn calculate_directory_sha256(dir_path: &Path) -> Result<String> {
    use sha2::{Digest, Sha256};
    use tokio::io::AsyncReadExt;

    let mut entries = Vec::new();
    for entry in walkdir::WalkDir::new(dir_path).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_file() {
            entries.push(entry.into_path());
        }
    }
    entries.sort();

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    for path in entries {
        let rel_path = path.strip_prefix(dir_path)?;
        hasher.update(rel_path.to_string_lossy().as_bytes());

        let mut file = tokio::fs::File::open(&path)
            .await
            .fs_context("opening file for hashing", &path)?;

        loop {
            let n = file
                .read(&mut buffer)
                .await
                .fs_context("reading file for hash calculation", &path)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
    }

    Ok(format!("{:x}", hasher.finalize()))
}
