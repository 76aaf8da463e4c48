//! Configuration structures for bundling operations.
//!
//! [`BundleConfig`] is the immutable description of the application being
//! packaged, constructed once through [`BundleConfigBuilder`]. [`BundleLayout`]
//! derives every on-disk path of the `.app` bundle from the configured name.

use crate::bundler::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default application name when none is configured.
pub const DEFAULT_NAME: &str = "My Go Application";

/// Default author when none is configured.
pub const DEFAULT_AUTHOR: &str = "Appify by Machine Box";

/// Default application version when none is configured.
pub const DEFAULT_VERSION: &str = "1.0";

/// Launch mode of the bundled application.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleMode {
    /// Regular application with a dock icon and menu bar.
    #[default]
    Normal,
    /// Background application with no dock icon or menu bar (`LSUIElement`).
    Tray,
}

impl BundleMode {
    /// Returns the lowercase name used on the command line and in the manifest data.
    pub fn as_str(&self) -> &'static str {
        match self {
            BundleMode::Normal => "normal",
            BundleMode::Tray => "tray",
        }
    }
}

impl fmt::Display for BundleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BundleMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "normal" => Ok(BundleMode::Normal),
            "tray" => Ok(BundleMode::Tray),
            other => Err(format!("unknown mode '{other}' (expected normal or tray)")),
        }
    }
}

/// Application metadata consumed by the bundling pipeline.
///
/// Read-only once built; see [`BundleConfig::builder`].
///
/// # Examples
///
/// ```
/// use appify::bundler::{BundleConfig, BundleMode};
///
/// let config = BundleConfig::builder()
///     .name("Demo")
///     .author("Acme")
///     .mode(BundleMode::Tray)
///     .build()?;
///
/// assert_eq!(config.identifier(), "Acme.Demo");
/// assert_eq!(config.info_string(), "Demo by Acme");
/// # Ok::<(), appify::bundler::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleConfig {
    name: String,
    author: String,
    version: String,
    identifier: String,
    icon: Option<PathBuf>,
    mode: BundleMode,
}

impl BundleConfig {
    /// Starts a builder populated with the default name, author and version.
    pub fn builder() -> BundleConfigBuilder {
        BundleConfigBuilder::new()
    }

    /// Application name shown to users; also names the bundle directory.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Author credited in the bundle's info string.
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Bundle version string.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Reverse-DNS style bundle identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Optional icon source file.
    pub fn icon(&self) -> Option<&Path> {
        self.icon.as_deref()
    }

    /// Launch mode.
    pub fn mode(&self) -> BundleMode {
        self.mode
    }

    /// `"<name> by <author>"`.
    pub fn info_string(&self) -> String {
        format!("{} by {}", self.name, self.author)
    }

    /// Directory name of the bundle, `"<name>.app"`.
    pub fn app_dir_name(&self) -> String {
        format!("{}.app", self.name)
    }
}

/// Builder for [`BundleConfig`].
#[derive(Debug, Clone)]
pub struct BundleConfigBuilder {
    name: String,
    author: String,
    version: String,
    identifier: Option<String>,
    icon: Option<PathBuf>,
    mode: BundleMode,
}

impl Default for BundleConfigBuilder {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            author: DEFAULT_AUTHOR.to_string(),
            version: DEFAULT_VERSION.to_string(),
            identifier: None,
            icon: None,
            mode: BundleMode::Normal,
        }
    }
}

impl BundleConfigBuilder {
    /// Creates a new builder with defaults.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the application name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the author.
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Sets the version string.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Overrides the bundle identifier.
    ///
    /// Default: `"<author>.<name>"`. An empty string also selects the default.
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Sets the icon source file.
    pub fn icon<P: AsRef<Path>>(mut self, icon: P) -> Self {
        self.icon = Some(icon.as_ref().to_path_buf());
        self
    }

    /// Sets the launch mode.
    pub fn mode(mut self, mode: BundleMode) -> Self {
        self.mode = mode;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the name is empty or contains a path
    /// separator, or if the version is empty.
    pub fn build(self) -> Result<BundleConfig> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidConfig("name must not be empty".into()));
        }
        if self.name.contains(['/', '\\']) || self.name == "." || self.name == ".." {
            return Err(Error::InvalidConfig(format!(
                "name '{}' cannot be used as a bundle directory name",
                self.name
            )));
        }
        if self.version.trim().is_empty() {
            return Err(Error::InvalidConfig("version must not be empty".into()));
        }

        let identifier = match self.identifier {
            Some(id) if !id.is_empty() => id,
            _ => format!("{}.{}", self.author, self.name),
        };

        Ok(BundleConfig {
            name: self.name,
            author: self.author,
            version: self.version,
            identifier,
            icon: self.icon,
            mode: self.mode,
        })
    }
}

/// Paths of a `.app` bundle rooted in some output directory.
///
/// ```text
/// <root>/<name>.app/
///   Contents/
///     Info.plist
///     README
///     MacOS/<name>.app
///     Resources/
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleLayout {
    /// `<root>/<name>.app`
    pub bundle_root: PathBuf,
    /// `Contents`
    pub contents_dir: PathBuf,
    /// `Contents/MacOS`
    pub executable_dir: PathBuf,
    /// `Contents/Resources`
    pub resources_dir: PathBuf,
    /// `Contents/MacOS/<name>.app`
    pub executable_path: PathBuf,
    /// `Contents/Info.plist`
    pub manifest_path: PathBuf,
    /// `Contents/README`
    pub readme_path: PathBuf,
}

impl BundleLayout {
    /// Derives the layout for `name` under `root`.
    pub fn new(root: &Path, name: &str) -> Self {
        let app_dir_name = format!("{name}.app");
        let bundle_root = root.join(&app_dir_name);
        let contents_dir = bundle_root.join("Contents");
        let executable_dir = contents_dir.join("MacOS");
        let resources_dir = contents_dir.join("Resources");

        Self {
            executable_path: executable_dir.join(&app_dir_name),
            manifest_path: contents_dir.join("Info.plist"),
            readme_path: contents_dir.join("README"),
            bundle_root,
            contents_dir,
            executable_dir,
            resources_dir,
        }
    }

    /// Executable path relative to `Contents`, as recorded in the manifest.
    pub fn relative_executable(&self) -> String {
        let file_name = self
            .executable_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("MacOS/{file_name}")
    }
}
