//! Platform-specific bundling implementations.
//!
//! Only macOS targets exist. The modules are compiled on every host so the
//! bundle layout can be produced (and tested) anywhere; only the disk image
//! step needs `hdiutil` at run time.
//!
//! # Bundling Order
//!
//! The DMG installer requires the .app bundle to exist. The
//! [`PackageType::priority()`] method ensures correct build order.

pub mod macos;

use std::fmt;

/// Supported package types for bundling.
///
/// # Examples
///
/// ```
/// use appify::bundler::PackageType;
///
/// let mut types = vec![PackageType::Dmg, PackageType::MacOsBundle];
/// types.sort_by_key(|t| t.priority());
/// assert_eq!(types, [PackageType::MacOsBundle, PackageType::Dmg]);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum PackageType {
    /// macOS application bundle (.app).
    ///
    /// Creates a `.app` bundle with Info.plist, executable and resources.
    MacOsBundle,

    /// macOS DMG disk image (.dmg).
    ///
    /// Creates a compressed disk image containing the .app bundle.
    /// Requires [`MacOsBundle`](Self::MacOsBundle) to be built first.
    Dmg,
}

impl PackageType {
    /// Returns the short name for this package type.
    ///
    /// This is the lowercase identifier used in CLI output.
    pub fn short_name(&self) -> &'static str {
        match self {
            PackageType::MacOsBundle => "app",
            PackageType::Dmg => "dmg",
        }
    }

    /// Returns the priority for bundling order.
    ///
    /// Lower numbers are bundled first.
    pub fn priority(&self) -> u32 {
        match self {
            PackageType::MacOsBundle => 0,
            PackageType::Dmg => 1, // Requires .app to be built first
        }
    }

    /// Every package type, in bundling order.
    pub fn all() -> Vec<PackageType> {
        vec![PackageType::MacOsBundle, PackageType::Dmg]
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}
