//! Error types for bundler operations.
//!
//! Every failing step wraps the underlying cause instead of swallowing it, so
//! the rendered error reads as a chain from the outermost step down to the
//! original I/O, template, image or process failure.
//!
//! # Features
//!
//! - **Context trait**: Add context to errors similar to anyhow
//! - **ErrorExt trait**: Filesystem operations with automatic path context
//! - **bail! macro**: Early return with formatted error messages
//!
//! # Example
//!
//! ```no_run
//! use appify::bundler::{Context, ErrorExt, Result};
//! use std::path::Path;
//!
//! fn read_readme(contents_dir: &Path) -> Result<String> {
//!     let path = contents_dir.join("README");
//!     std::fs::read_to_string(&path)
//!         .fs_context("reading bundle README", &path)
//!         .context("inspecting bundle")
//! }
//! ```

use crate::bundler::platform::macos::dmg::DmgPhase;
use std::{
    fmt::Display,
    io,
    path::{self, PathBuf},
};
use thiserror::Error as DeriveError;

/// Errors returned by the bundler.
///
/// Matches the failure taxonomy of the packaging pipeline: missing inputs,
/// unsupported or unconvertible icons, filesystem failures, external tool
/// failures and the tree-copy overwrite guard.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Error with context. Created by the [`Context`] trait.
    ///
    /// Identifies the step that failed while keeping the cause attached.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// File system error with path context.
    ///
    /// Permission problems surface here with [`io::ErrorKind::PermissionDenied`].
    /// Created by the [`ErrorExt`] trait's `fs_context` method.
    #[error("{context} {path}: {error}")]
    Fs {
        /// Context describing the operation (e.g., "creating MacOS directory")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// An external command could not be started at all.
    #[error("failed to run command {command}: {error}")]
    CommandFailed {
        /// Command that failed to execute
        command: String,
        /// The underlying error
        error: io::Error,
    },

    /// A required input file does not exist.
    #[error("{what} not found: {path}")]
    NotFound {
        /// Which input was missing ("executable", "icon file")
        what: &'static str,
        /// Path that was looked up
        path: PathBuf,
    },

    /// Icon source has an extension outside the supported set.
    #[error(
        "'{extension}' icons are not supported (expected .icns, .png, .jpg, .jpeg or .gif)"
    )]
    UnsupportedFormat {
        /// The rejected extension, lowercased, without the leading dot
        extension: String,
    },

    /// Decoding the source image or encoding the icon container failed.
    #[error("icon conversion failed while {stage}: {source}")]
    ConversionFailed {
        /// Conversion stage that failed
        stage: &'static str,
        /// Error reported by the image or icns library
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Tree copy refused to overwrite an existing file.
    #[error("destination already exists: {path}")]
    DestinationExists {
        /// Destination file that was already present
        path: PathBuf,
    },

    /// The disk image utility exited unsuccessfully.
    #[error("hdiutil {phase} failed ({status}): {diagnostics}")]
    ExternalToolFailed {
        /// Pipeline phase that invoked the tool
        phase: DmgPhase,
        /// Exit status as reported by the OS
        status: String,
        /// Diagnostic output captured from the tool
        diagnostics: String,
    },

    /// `hdiutil attach` succeeded but printed no device identifier.
    #[error("no device output by hdiutil attach")]
    NoDeviceReturned,

    /// A required external tool is not on `PATH`.
    #[error("required tool `{tool}` not found: {error}")]
    ToolNotFound {
        /// Tool name
        tool: &'static str,
        /// Lookup error
        error: which::Error,
    },

    /// Bundle configuration rejected before any work started.
    #[error("invalid bundle configuration: {0}")]
    InvalidConfig(String),

    /// Rendered manifest is not a usable property list.
    #[error("invalid Info.plist: {0}")]
    InvalidManifest(String),

    /// Generic I/O error.
    #[error("{0}")]
    IoError(#[from] io::Error),

    /// Error walking a directory tree.
    #[error("{0}")]
    WalkdirError(#[from] walkdir::Error),

    /// Path prefix stripping error.
    #[error("{0}")]
    StripError(#[from] path::StripPrefixError),

    /// Handlebars template rendering error.
    #[error("{0}")]
    HandleBarsError(#[from] handlebars::RenderError),

    /// Handlebars template parsing error.
    #[error("{0}")]
    Template(#[from] handlebars::TemplateError),

    /// Property list parsing error.
    #[error("{0}")]
    Plist(#[from] plist::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    GenericError(String),
}

impl Error {
    /// Returns the innermost error beneath any [`Error::Context`] layers.
    pub fn root_cause(&self) -> &Error {
        let mut current = self;
        while let Error::Context(_, inner) = current {
            current = inner;
        }
        current
    }
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for adding context to errors.
///
/// Similar to `anyhow::Context` but integrated with bundler's Error type.
/// Works with both `Result<T, E>` and `Option<T>`.
pub trait Context<T> {
    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation).
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context(context.to_string(), Box::new(e)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::Context(f().to_string(), Box::new(e)))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Extension trait for filesystem operations with automatic path context.
///
/// Wraps I/O errors with the path that caused them for better diagnostics.
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    ///
    /// The `context` should be a present-tense verb phrase describing the operation,
    /// e.g., "reading file", "creating directory", "copying binary".
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}

/// Macro for early return with error.
///
/// Converts the message into a [`Error::GenericError`] and returns immediately.
///
/// # Examples
///
/// ```ignore
/// bail!("operation failed");
/// bail!("invalid value: {}", value);
/// ```
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::bundler::Error::GenericError($msg.into()))
    };
    ($err:expr $(,)?) => {
        return Err($crate::bundler::Error::GenericError($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($fmt, $($arg)*)))
    };
}
