//! macOS DMG disk image creator.
//!
//! Builds a compressed image containing the `.app` bundle by driving a
//! [`DiskImageTool`] through five phases:
//!
//! ```text
//! Start -> CreateTemplate -> Attach -> Populate -> Detach -> Convert -> Done
//! ```
//!
//! Any phase may move the build to `Failed`. All temporary state (empty seed
//! folder, mount point, writable template image) lives in a scoped workspace
//! inside the output directory, which is removed when the build is dropped.
//! A device that was attached is always detached before that removal, also
//! when populating the image failed.

use crate::bundler::error::{Context, Error, Result};
use crate::bundler::platform::macos::hdiutil::{DiskImageTool, TemplateSpec};
use crate::bundler::utils::fs;
use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Smallest blank image ever requested, in megabytes.
pub const MIN_TEMPLATE_SIZE_MB: u64 = 10;

/// Fixed headroom added on top of the bundle footprint, in megabytes.
const TEMPLATE_HEADROOM_MB: u64 = 4;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// One transition of the disk image pipeline.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DmgPhase {
    /// Create the writable blank image.
    CreateTemplate,
    /// Mount the blank image and capture its device.
    Attach,
    /// Copy the bundle into the mount point.
    Populate,
    /// Unmount the device.
    Detach,
    /// Compress into the final image.
    Convert,
}

impl DmgPhase {
    /// Phase name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            DmgPhase::CreateTemplate => "create",
            DmgPhase::Attach => "attach",
            DmgPhase::Populate => "populate",
            DmgPhase::Detach => "detach",
            DmgPhase::Convert => "convert",
        }
    }

    fn completed(self) -> BuildState {
        match self {
            DmgPhase::CreateTemplate => BuildState::TemplateCreated,
            DmgPhase::Attach => BuildState::Attached,
            DmgPhase::Populate => BuildState::Populated,
            DmgPhase::Detach => BuildState::Detached,
            DmgPhase::Convert => BuildState::Done,
        }
    }
}

impl fmt::Display for DmgPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a [`DiskImageBuild`] currently stands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildState {
    /// Nothing run yet.
    Start,
    /// Blank writable image exists.
    TemplateCreated,
    /// Image mounted; a device is held.
    Attached,
    /// Bundle copied into the mounted image.
    Populated,
    /// Device released.
    Detached,
    /// Final image written.
    Done,
    /// The given phase failed; no further phase runs.
    Failed(DmgPhase),
}

impl BuildState {
    /// Phase that moves the build out of this state, if any.
    pub fn next_phase(&self) -> Option<DmgPhase> {
        match self {
            BuildState::Start => Some(DmgPhase::CreateTemplate),
            BuildState::TemplateCreated => Some(DmgPhase::Attach),
            BuildState::Attached => Some(DmgPhase::Populate),
            BuildState::Populated => Some(DmgPhase::Detach),
            BuildState::Detached => Some(DmgPhase::Convert),
            BuildState::Done | BuildState::Failed(_) => None,
        }
    }
}

/// Blank image size for a bundle of `footprint_bytes`.
///
/// 125% of the footprint plus fixed headroom, never below
/// [`MIN_TEMPLATE_SIZE_MB`].
pub fn template_size_mb(footprint_bytes: u64) -> u64 {
    let padded = footprint_bytes.saturating_add(footprint_bytes / 4);
    let padded_mb = padded.div_ceil(BYTES_PER_MB);
    (padded_mb + TEMPLATE_HEADROOM_MB).max(MIN_TEMPLATE_SIZE_MB)
}

/// Builds `<output_dir>/<app_name>.dmg` from the bundle at `bundle_dir`.
///
/// Blocks until the last external command has finished. The temporary
/// workspace is gone by the time this returns, success or failure.
pub fn build_disk_image<T: DiskImageTool>(
    tool: &T,
    app_name: &str,
    bundle_dir: &Path,
    output_dir: &Path,
) -> Result<PathBuf> {
    DiskImageBuild::new(tool, app_name, bundle_dir, output_dir)?.run()
}

/// A single disk image build, advanced one phase at a time.
pub struct DiskImageBuild<'a, T: DiskImageTool> {
    tool: &'a T,
    bundle_dir: PathBuf,
    output: PathBuf,
    state: BuildState,
    device: Option<String>,
    workspace: TempDir,
}

impl<'a, T: DiskImageTool> DiskImageBuild<'a, T> {
    /// Prepares the scoped workspace; no external command runs yet.
    pub fn new(tool: &'a T, app_name: &str, bundle_dir: &Path, output_dir: &Path) -> Result<Self> {
        let workspace = tempfile::Builder::new()
            .prefix(".appify-dmg-")
            .tempdir_in(output_dir)
            .map_err(|error| Error::Fs {
                context: "creating disk image workspace in",
                path: output_dir.to_path_buf(),
                error,
            })?;

        Ok(Self {
            tool,
            bundle_dir: bundle_dir.to_path_buf(),
            output: output_dir.join(format!("{app_name}.dmg")),
            state: BuildState::Start,
            device: None,
            workspace,
        })
    }

    /// Current state.
    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Path of the final compressed image.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Root of the temporary workspace.
    pub fn workspace(&self) -> &Path {
        self.workspace.path()
    }

    fn template_image(&self) -> PathBuf {
        self.workspace.path().join("template.dmg")
    }

    fn mount_point(&self) -> PathBuf {
        self.workspace.path().join("mount")
    }

    fn seed_folder(&self) -> PathBuf {
        self.workspace.path().join("empty")
    }

    /// Runs the next phase and returns the resulting state.
    ///
    /// Returns the current state unchanged once `Done` or `Failed`.
    pub fn step(&mut self) -> Result<BuildState> {
        let Some(phase) = self.state.next_phase() else {
            return Ok(self.state);
        };

        log::info!("DMG phase: {phase}");
        match self.run_phase(phase) {
            Ok(()) => {
                self.state = phase.completed();
                Ok(self.state)
            }
            Err(e) => {
                self.state = BuildState::Failed(phase);
                Err(e).with_context(|| format!("{phase} phase failed"))
            }
        }
    }

    /// Steps until `Done`, returning the final image path.
    pub fn run(mut self) -> Result<PathBuf> {
        while self.step()? != BuildState::Done {}
        log::info!("✓ Created DMG: {}", self.output.display());
        Ok(self.output.clone())
    }

    fn run_phase(&mut self, phase: DmgPhase) -> Result<()> {
        match phase {
            DmgPhase::CreateTemplate => self.create_template(),
            DmgPhase::Attach => self.attach(),
            DmgPhase::Populate => fs::deep_copy(&self.bundle_dir, &self.mount_point())
                .context("copying app into disk image"),
            DmgPhase::Detach => self.detach(),
            DmgPhase::Convert => self.convert(),
        }
    }

    fn create_template(&mut self) -> Result<()> {
        let footprint = fs::dir_footprint(&self.bundle_dir)
            .context("measuring bundle size")?;
        let seed = self.seed_folder();
        std::fs::create_dir(&seed).map_err(|error| Error::Fs {
            context: "creating empty seed folder",
            path: seed.clone(),
            error,
        })?;

        let template = self.template_image();
        let spec = TemplateSpec {
            size_mb: template_size_mb(footprint),
            src_folder: &seed,
            output: &template,
        };
        log::debug!("Requesting {} MB template image", spec.size_mb);
        self.tool.create(&spec)
    }

    fn attach(&mut self) -> Result<()> {
        let mount_point = self.mount_point();
        std::fs::create_dir(&mount_point).map_err(|error| Error::Fs {
            context: "creating mount point",
            path: mount_point.clone(),
            error,
        })?;

        let stdout = self.tool.attach(&self.template_image(), &mount_point)?;
        let device = stdout
            .split_whitespace()
            .next()
            .ok_or(Error::NoDeviceReturned)?;
        log::debug!("Attached {} at {}", device, mount_point.display());
        self.device = Some(device.to_string());
        Ok(())
    }

    fn detach(&mut self) -> Result<()> {
        let device = self
            .device
            .take()
            .ok_or_else(|| Error::GenericError("no attached device to detach".into()))?;
        self.tool.detach(&device)
    }

    fn convert(&mut self) -> Result<()> {
        if self.output.exists() {
            std::fs::remove_file(&self.output).map_err(|error| Error::Fs {
                context: "removing previous disk image",
                path: self.output.clone(),
                error,
            })?;
        }
        self.tool.convert(&self.template_image(), &self.output)
    }
}

impl<T: DiskImageTool> Drop for DiskImageBuild<'_, T> {
    fn drop(&mut self) {
        // Runs before the workspace field is dropped, so the mount point is
        // released before its directory is removed.
        if let Some(device) = self.device.take() {
            log::debug!("Detaching {device} during cleanup");
            if let Err(e) = self.tool.detach(&device) {
                log::warn!("Failed to detach {device} during cleanup: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Create(u64),
        Attach,
        Detach(String),
        Convert(PathBuf),
    }

    #[derive(Default)]
    struct FakeTool {
        calls: RefCell<Vec<Call>>,
        attach_stdout: Option<String>,
        /// Relative path pre-created inside the mount point on attach.
        plant_on_attach: Option<&'static str>,
        fail_detach: bool,
    }

    impl FakeTool {
        fn new() -> Self {
            Self {
                attach_stdout: Some("/dev/disk42\tApple_HFS\t/mnt\n".into()),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }
    }

    impl DiskImageTool for FakeTool {
        fn create(&self, spec: &TemplateSpec<'_>) -> Result<()> {
            self.calls.borrow_mut().push(Call::Create(spec.size_mb));
            std::fs::write(spec.output, b"UDRW").map_err(Error::from)
        }

        fn attach(&self, image: &Path, mount_point: &Path) -> Result<String> {
            self.calls.borrow_mut().push(Call::Attach);
            assert!(image.exists(), "template image must exist before attach");
            if let Some(rel) = self.plant_on_attach {
                let planted = mount_point.join(rel);
                std::fs::create_dir_all(planted.parent().unwrap())?;
                std::fs::write(planted, b"already here")?;
            }
            Ok(self.attach_stdout.clone().unwrap_or_default())
        }

        fn detach(&self, device: &str) -> Result<()> {
            self.calls.borrow_mut().push(Call::Detach(device.to_string()));
            if self.fail_detach {
                return Err(Error::ExternalToolFailed {
                    phase: DmgPhase::Detach,
                    status: "exit status: 16".into(),
                    diagnostics: "resource busy".into(),
                });
            }
            Ok(())
        }

        fn convert(&self, image: &Path, output: &Path) -> Result<()> {
            self.calls.borrow_mut().push(Call::Convert(output.to_path_buf()));
            std::fs::copy(image, output)?;
            Ok(())
        }
    }

    fn make_bundle(root: &Path) -> PathBuf {
        let app = root.join("Demo.app");
        std::fs::create_dir_all(app.join("Contents/MacOS")).unwrap();
        std::fs::write(app.join("Contents/MacOS/Demo.app"), b"binary").unwrap();
        std::fs::write(app.join("Contents/Info.plist"), b"<plist/>").unwrap();
        app
    }

    fn leftover_workspaces(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with(".appify-dmg-"))
            .collect()
    }

    #[test]
    fn test_phases_run_in_order() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let app = make_bundle(src.path());
        let tool = FakeTool::new();

        let dmg = build_disk_image(&tool, "Demo", &app, out.path()).unwrap();

        assert_eq!(dmg, out.path().join("Demo.dmg"));
        assert!(dmg.exists());
        assert_eq!(
            tool.calls(),
            vec![
                Call::Create(MIN_TEMPLATE_SIZE_MB),
                Call::Attach,
                Call::Detach("/dev/disk42".into()),
                Call::Convert(out.path().join("Demo.dmg")),
            ]
        );
        assert!(leftover_workspaces(out.path()).is_empty());
    }

    #[test]
    fn test_step_reports_each_state() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let app = make_bundle(src.path());
        let tool = FakeTool::new();

        let mut build = DiskImageBuild::new(&tool, "Demo", &app, out.path()).unwrap();
        assert_eq!(build.state(), BuildState::Start);
        assert_eq!(build.step().unwrap(), BuildState::TemplateCreated);
        assert_eq!(build.step().unwrap(), BuildState::Attached);
        assert_eq!(build.step().unwrap(), BuildState::Populated);
        assert!(build.workspace().join("mount/Demo.app/Contents/Info.plist").exists());
        assert_eq!(build.step().unwrap(), BuildState::Detached);
        assert_eq!(build.step().unwrap(), BuildState::Done);
        assert_eq!(build.step().unwrap(), BuildState::Done);
    }

    #[test]
    fn test_populate_failure_still_detaches_and_cleans_up() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let app = make_bundle(src.path());
        let tool = FakeTool {
            plant_on_attach: Some("Demo.app/Contents/Info.plist"),
            ..FakeTool::new()
        };

        let err = build_disk_image(&tool, "Demo", &app, out.path()).unwrap_err();

        assert!(matches!(err.root_cause(), Error::DestinationExists { .. }));
        assert!(err.to_string().starts_with("populate phase failed"));
        assert_eq!(
            tool.calls(),
            vec![
                Call::Create(MIN_TEMPLATE_SIZE_MB),
                Call::Attach,
                Call::Detach("/dev/disk42".into()),
            ]
        );
        assert!(!out.path().join("Demo.dmg").exists());
        assert!(leftover_workspaces(out.path()).is_empty());
    }

    #[test]
    fn test_failed_build_stops_advancing() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let app = make_bundle(src.path());
        let tool = FakeTool {
            plant_on_attach: Some("Demo.app/Contents/Info.plist"),
            ..FakeTool::new()
        };

        let mut build = DiskImageBuild::new(&tool, "Demo", &app, out.path()).unwrap();
        build.step().unwrap();
        build.step().unwrap();
        assert!(build.step().is_err());
        assert_eq!(build.state(), BuildState::Failed(DmgPhase::Populate));
        assert_eq!(build.step().unwrap(), BuildState::Failed(DmgPhase::Populate));

        drop(build);
        assert_eq!(tool.calls().last(), Some(&Call::Detach("/dev/disk42".into())));
    }

    #[test]
    fn test_empty_attach_output_is_no_device() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let app = make_bundle(src.path());
        let tool = FakeTool {
            attach_stdout: Some("  \n".into()),
            ..FakeTool::new()
        };

        let err = build_disk_image(&tool, "Demo", &app, out.path()).unwrap_err();

        assert!(matches!(err.root_cause(), Error::NoDeviceReturned));
        assert!(!tool.calls().iter().any(|c| matches!(c, Call::Detach(_))));
        assert!(leftover_workspaces(out.path()).is_empty());
    }

    #[test]
    fn test_detach_failure_skips_convert() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let app = make_bundle(src.path());
        let tool = FakeTool {
            fail_detach: true,
            ..FakeTool::new()
        };

        let err = build_disk_image(&tool, "Demo", &app, out.path()).unwrap_err();

        assert!(err.to_string().contains("resource busy"));
        assert!(!tool.calls().iter().any(|c| matches!(c, Call::Convert(_))));
        // detach is attempted exactly once
        let detaches = tool
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Detach(_)))
            .count();
        assert_eq!(detaches, 1);
    }

    #[test]
    fn test_previous_image_is_replaced() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let app = make_bundle(src.path());
        std::fs::write(out.path().join("Demo.dmg"), b"stale").unwrap();

        build_disk_image(&FakeTool::new(), "Demo", &app, out.path()).unwrap();

        assert_eq!(std::fs::read(out.path().join("Demo.dmg")).unwrap(), b"UDRW");
    }

    #[test]
    fn test_template_size_has_floor_and_headroom() {
        assert_eq!(template_size_mb(0), MIN_TEMPLATE_SIZE_MB);
        assert_eq!(template_size_mb(3 * BYTES_PER_MB), MIN_TEMPLATE_SIZE_MB);
        // 40 MB * 1.25 = 50 MB, + 4 MB headroom
        assert_eq!(template_size_mb(40 * BYTES_PER_MB), 54);
    }
}
