//! # Appify
//!
//! Turns a standalone executable into a double-clickable macOS application.
//!
//! The [`bundler`] assembles `<name>.app` (directory skeleton, executable,
//! optional icon, `Info.plist`, README) and then drives `hdiutil` through
//! create, attach, populate, detach and convert to produce a compressed
//! `<name>.dmg`. The temporary workspace and any mounted device are released
//! on every exit path.
//!
//! ## Usage
//!
//! ```bash
//! appify ./myserver
//! appify --name "My App" --author "Acme" --icon logo.png ./myserver
//! appify --mode tray --no-dmg ./menubar-helper
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Core modules
pub mod bundler;
pub mod cli;
pub mod error;

// Re-export main types for public API
pub use bundler::{BundleConfig, BundleMode, BundledArtifact, Bundler, PackageType};
pub use cli::Args;
pub use error::{AppifyError, CliError, Result};
