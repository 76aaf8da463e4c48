//! macOS bundling support for .app bundles and DMG disk images.
//!
//! # Supported Formats
//!
//! - **Application Bundle (.app)**: via [`app`] module
//! - **Disk Image (.dmg)**: via [`dmg`] module
//!
//! # Build Requirements
//!
//! | Format | Required Tools | Notes |
//! |--------|----------------|-------|
//! | .app | none | Pure filesystem work, runs on any host |
//! | .dmg | `hdiutil` | Built into macOS |
//!
//! # Output Location
//!
//! Both artifacts land directly in the output directory:
//! - `<output>/MyApp.app` - Application bundle
//! - `<output>/MyApp.dmg` - Disk image
//!
//! # Icon Conversion
//!
//! The [`icon`] module turns PNG, JPEG and GIF sources into ICNS resources.

pub mod app;
pub mod dmg;
pub mod hdiutil;
pub mod icon;
pub mod manifest;
