//! macOS application bundler.
//!
//! Wraps a standalone executable into a `.app` bundle and then into a
//! compressed `.dmg` disk image.
//!
//! # Pipeline
//!
//! | Step | Module | Notes |
//! |------|--------|-------|
//! | Bundle assembly | `platform::macos::app` | Directory skeleton, executable, icon, Info.plist, README |
//! | Icon preparation | `platform::macos::icon` | `.icns` copied, PNG/JPEG/GIF converted |
//! | Disk image | `platform::macos::dmg` | create, attach, populate, detach, convert via `hdiutil` |
//!
//! # Integration
//!
//! ```no_run
//! use appify::bundler::{BundleConfig, BundleMode, Bundler, PackageType};
//! use std::path::Path;
//!
//! # async fn example() -> appify::bundler::Result<()> {
//! let config = BundleConfig::builder()
//!     .name("Demo")
//!     .author("Acme")
//!     .mode(BundleMode::Tray)
//!     .icon("assets/icon.png")
//!     .build()?;
//!
//! let artifacts = Bundler::new(config)
//!     .package_types([PackageType::MacOsBundle])
//!     .bundle(Path::new("target/release/demo"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod builder;
mod error;
pub mod platform;
mod settings;
mod utils;

// Public re-exports
pub use builder::Bundler;
pub use error::{Context, Error, ErrorExt, Result};
pub use platform::PackageType;
pub use platform::macos::dmg::{BuildState, DiskImageBuild, DmgPhase, build_disk_image};
pub use platform::macos::hdiutil::{DiskImageTool, Hdiutil, TemplateSpec};
pub use settings::{
    BundleConfig, BundleConfigBuilder, BundleLayout, BundleMode, DEFAULT_AUTHOR, DEFAULT_NAME,
    DEFAULT_VERSION,
};
pub use utils::fs::{deep_copy, dir_footprint};

/// A bundled artifact result containing metadata about created packages.
///
/// # Fields
///
/// - `package_type`: The format of the created package (app or dmg)
/// - `paths`: All files created as part of this bundle
/// - `size`: Total size of the main artifact in bytes (sum of files for a `.app` directory)
/// - `checksum`: SHA-256 checksum for integrity verification
///
/// # Examples
///
/// ```no_run
/// use appify::bundler::{BundleConfig, Bundler};
/// use std::path::Path;
///
/// # async fn example() -> appify::bundler::Result<()> {
/// let bundler = Bundler::new(BundleConfig::builder().build()?);
/// let artifacts = bundler.bundle(Path::new("myapp")).await?;
///
/// for artifact in artifacts {
///     println!("Created {}: {} bytes",
///         artifact.package_type,
///         artifact.size
///     );
///     println!("SHA256: {}", artifact.checksum);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BundledArtifact {
    /// The package type that was created.
    pub package_type: PackageType,

    /// Paths to all files created as part of this bundle.
    pub paths: Vec<std::path::PathBuf>,

    /// Total size of the main artifact in bytes.
    pub size: u64,

    /// SHA-256 checksum of the main artifact for integrity verification.
    ///
    /// Directory bundles are hashed file by file in sorted path order.
    pub checksum: String,
}
