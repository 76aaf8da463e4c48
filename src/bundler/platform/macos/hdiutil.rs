//! The `hdiutil` disk image utility, behind a trait.
//!
//! [`DiskImageTool`] is the command/response contract the disk image builder
//! relies on; [`Hdiutil`] implements it by running the real binary. Every call
//! blocks until the process exits and judges success by the exit status.

use crate::bundler::error::{Error, Result};
use crate::bundler::platform::macos::dmg::DmgPhase;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Parameters for creating the writable blank image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSpec<'a> {
    /// Image size in megabytes.
    pub size_mb: u64,
    /// Folder whose (empty) contents seed the image.
    pub src_folder: &'a Path,
    /// Output path of the writable image.
    pub output: &'a Path,
}

/// External disk image utility operations.
pub trait DiskImageTool {
    /// Creates a writable, filesystem-formatted blank image.
    fn create(&self, spec: &TemplateSpec<'_>) -> Result<()>;

    /// Mounts `image` at `mount_point`; returns the tool's standard output,
    /// whose first whitespace-delimited token is the device identifier.
    fn attach(&self, image: &Path, mount_point: &Path) -> Result<String>;

    /// Unmounts the device returned by [`attach`](Self::attach).
    fn detach(&self, device: &str) -> Result<()>;

    /// Compresses `image` into the final read-only image at `output`.
    fn convert(&self, image: &Path, output: &Path) -> Result<()>;
}

/// Runs `hdiutil` as a child process.
#[derive(Debug, Clone)]
pub struct Hdiutil {
    program: PathBuf,
}

impl Default for Hdiutil {
    fn default() -> Self {
        Self::new()
    }
}

impl Hdiutil {
    /// Uses `hdiutil` as resolved through `PATH` at spawn time.
    pub fn new() -> Self {
        Self::with_program("hdiutil")
    }

    /// Uses an explicit program path.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Locates `hdiutil` on `PATH` up front.
    ///
    /// # Errors
    ///
    /// [`Error::ToolNotFound`] when it is not installed, e.g. on non-macOS hosts.
    pub fn locate() -> Result<Self> {
        let program = which::which("hdiutil").map_err(|error| Error::ToolNotFound {
            tool: "hdiutil",
            error,
        })?;
        log::debug!("Found hdiutil at: {}", program.display());
        Ok(Self { program })
    }

    /// Program this instance runs.
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn run(&self, phase: DmgPhase, args: &[OsString]) -> Result<Output> {
        let command_line = format!(
            "{} {}",
            self.program.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );
        log::debug!("Running {command_line}");

        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|error| Error::CommandFailed {
                command: command_line,
                error,
            })?;

        if !output.status.success() {
            return Err(Error::ExternalToolFailed {
                phase,
                status: output.status.to_string(),
                diagnostics: diagnostics(&output),
            });
        }
        Ok(output)
    }
}

impl DiskImageTool for Hdiutil {
    fn create(&self, spec: &TemplateSpec<'_>) -> Result<()> {
        self.run(DmgPhase::CreateTemplate, &create_args(spec))?;
        Ok(())
    }

    fn attach(&self, image: &Path, mount_point: &Path) -> Result<String> {
        let output = self.run(DmgPhase::Attach, &attach_args(image, mount_point))?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn detach(&self, device: &str) -> Result<()> {
        self.run(DmgPhase::Detach, &detach_args(device))?;
        Ok(())
    }

    fn convert(&self, image: &Path, output: &Path) -> Result<()> {
        self.run(DmgPhase::Convert, &convert_args(image, output))?;
        Ok(())
    }
}

fn os_args<const N: usize>(parts: [&OsStr; N]) -> Vec<OsString> {
    parts.iter().map(|p| p.to_os_string()).collect()
}

/// `hdiutil create -fs HFSX -layout SPUD -size <n>m -srcfolder <dir> -format UDRW -quiet <out>`
pub fn create_args(spec: &TemplateSpec<'_>) -> Vec<OsString> {
    let size = format!("{}m", spec.size_mb);
    os_args([
        OsStr::new("create"),
        OsStr::new("-fs"),
        OsStr::new("HFSX"),
        OsStr::new("-layout"),
        OsStr::new("SPUD"),
        OsStr::new("-size"),
        OsStr::new(&size),
        OsStr::new("-srcfolder"),
        spec.src_folder.as_os_str(),
        OsStr::new("-format"),
        OsStr::new("UDRW"),
        OsStr::new("-quiet"),
        spec.output.as_os_str(),
    ])
}

/// `hdiutil attach <image> -noautoopen -mountpoint <dir>`
pub fn attach_args(image: &Path, mount_point: &Path) -> Vec<OsString> {
    os_args([
        OsStr::new("attach"),
        image.as_os_str(),
        OsStr::new("-noautoopen"),
        OsStr::new("-mountpoint"),
        mount_point.as_os_str(),
    ])
}

/// `hdiutil detach <device>`
pub fn detach_args(device: &str) -> Vec<OsString> {
    os_args([OsStr::new("detach"), OsStr::new(device)])
}

/// `hdiutil convert <image> -format UDZO -imagekey zlib-level=9 -o <out>`
pub fn convert_args(image: &Path, output: &Path) -> Vec<OsString> {
    os_args([
        OsStr::new("convert"),
        image.as_os_str(),
        OsStr::new("-format"),
        OsStr::new("UDZO"),
        OsStr::new("-imagekey"),
        OsStr::new("zlib-level=9"),
        OsStr::new("-o"),
        output.as_os_str(),
    ])
}

fn diagnostics(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !stderr.is_empty() {
        return stderr;
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() {
        "no diagnostic output".to_string()
    } else {
        stdout
    }
}
