//! macOS application bundle (.app) creation.

use crate::bundler::{
    error::{Context, Error, ErrorExt, Result},
    platform::macos::{icon, manifest},
    settings::{BundleConfig, BundleLayout},
    utils::fs,
};
use std::path::Path;
use tokio::fs as tokio_fs;

/// Informational text written to `Contents/README`.
pub const README: &str = "Made with Appify by Machine Box
https://github.com/machinebox/appify

Inspired by https://gist.github.com/anmoljagetia/d37da67b9d408b35ac753ce51e420132 
";

/// Assembles `<output_dir>/<name>.app` around `binary`.
///
/// Any previous bundle at that path is removed first. Steps run in order:
/// directory skeleton, executable, optional icon, `Info.plist`, `README`.
/// The first failing step aborts assembly; files already written are left
/// on disk.
pub async fn assemble_bundle(
    config: &BundleConfig,
    binary: &Path,
    output_dir: &Path,
) -> Result<BundleLayout> {
    if !tokio_fs::try_exists(binary).await.unwrap_or(false) {
        return Err(Error::NotFound {
            what: "executable",
            path: binary.to_path_buf(),
        });
    }

    let layout = BundleLayout::new(output_dir, config.name());
    log::info!(
        "Bundling {} at {}",
        config.app_dir_name(),
        layout.bundle_root.display()
    );

    fs::remove_dir_all(&layout.bundle_root)
        .await
        .context("failed to remove old app bundle")?;

    create_skeleton(&layout).await?;
    install_executable(binary, &layout)
        .await
        .context("failed to install executable")?;

    let icon_file = match config.icon() {
        Some(source) => {
            let written = icon::prepare_icon(source, &layout.resources_dir)
                .await
                .context("icon")?;
            written
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        }
        None => None,
    };

    let data = manifest::ManifestData::new(config, layout.relative_executable(), icon_file);
    let plist = manifest::render_manifest(&data).context("failed to render Info.plist")?;
    tokio_fs::write(&layout.manifest_path, plist)
        .await
        .fs_context("failed to write Info.plist", &layout.manifest_path)?;

    tokio_fs::write(&layout.readme_path, README)
        .await
        .fs_context("failed to write README", &layout.readme_path)?;

    log::info!("✓ Created {}", layout.bundle_root.display());
    Ok(layout)
}

/// Creates `Contents/MacOS` and `Contents/Resources` with permissive modes.
async fn create_skeleton(layout: &BundleLayout) -> Result<()> {
    for dir in [&layout.executable_dir, &layout.resources_dir] {
        let mut builder = tokio_fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o777);
        builder
            .create(dir)
            .await
            .fs_context("failed to create bundle directory", dir)?;
    }
    Ok(())
}

/// Copies the binary into `MacOS/` and marks it and its directory executable.
async fn install_executable(binary: &Path, layout: &BundleLayout) -> Result<()> {
    tokio_fs::copy(binary, &layout.executable_path)
        .await
        .fs_context("failed to copy binary", binary)?;

    #[cfg(unix)]
    for path in [&layout.executable_dir, &layout.executable_path] {
        add_exec_bits(path).await?;
    }
    Ok(())
}

#[cfg(unix)]
async fn add_exec_bits(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = tokio_fs::metadata(path)
        .await
        .fs_context("failed to read permissions", path)?
        .permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    tokio_fs::set_permissions(path, permissions)
        .await
        .fs_context("failed to set executable permissions", path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::BundleMode;

    fn demo_config() -> BundleConfig {
        BundleConfig::builder()
            .name("Demo")
            .author("Acme")
            .build()
            .unwrap()
    }

    fn write_binary(dir: &Path) -> std::path::PathBuf {
        let binary = dir.join("demo-bin");
        std::fs::write(&binary, b"#!/bin/sh\necho demo\n").unwrap();
        binary
    }

    fn read_plist(layout: &BundleLayout) -> plist::Dictionary {
        plist::Value::from_file(&layout.manifest_path)
            .unwrap()
            .into_dictionary()
            .unwrap()
    }

    #[tokio::test]
    async fn test_assembles_demo_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let binary = write_binary(dir.path());
        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();

        let layout = assemble_bundle(&demo_config(), &binary, &out).await.unwrap();

        assert_eq!(layout.bundle_root, out.join("Demo.app"));
        assert_eq!(
            std::fs::read(out.join("Demo.app/Contents/MacOS/Demo.app")).unwrap(),
            std::fs::read(&binary).unwrap()
        );
        assert!(layout.resources_dir.is_dir());
        assert!(std::fs::read_to_string(&layout.readme_path).unwrap().contains("Appify"));

        let dict = read_plist(&layout);
        assert_eq!(dict.get("CFBundleName").and_then(|v| v.as_string()), Some("Demo"));
        assert_eq!(
            dict.get("CFBundleExecutable").and_then(|v| v.as_string()),
            Some("MacOS/Demo.app")
        );
        assert!(!dict.contains_key("CFBundleIconFile"));
        assert!(!dict.contains_key("LSUIElement"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_executable_and_its_directory_are_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let binary = write_binary(dir.path());
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o644)).unwrap();

        let layout = assemble_bundle(&demo_config(), &binary, dir.path()).await.unwrap();

        let mode = |p: &Path| std::fs::metadata(p).unwrap().permissions().mode();
        assert_eq!(mode(&layout.executable_path) & 0o111, 0o111);
        assert_eq!(mode(&layout.executable_dir) & 0o111, 0o111);
    }

    #[tokio::test]
    async fn test_png_icon_is_referenced_in_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let binary = write_binary(dir.path());
        let icon_path = dir.path().join("logo.png");
        image::RgbaImage::from_pixel(32, 32, image::Rgba([0, 0, 0, 255]))
            .save(&icon_path)
            .unwrap();
        let config = BundleConfig::builder()
            .name("Demo")
            .icon(&icon_path)
            .mode(BundleMode::Tray)
            .build()
            .unwrap();

        let layout = assemble_bundle(&config, &binary, dir.path()).await.unwrap();

        assert!(layout.resources_dir.join(icon::ICON_FILE_NAME).is_file());
        let dict = read_plist(&layout);
        assert_eq!(
            dict.get("CFBundleIconFile").and_then(|v| v.as_string()),
            Some("icon.icns")
        );
        assert_eq!(dict.get("LSUIElement").and_then(|v| v.as_boolean()), Some(true));
    }

    #[tokio::test]
    async fn test_missing_binary_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = assemble_bundle(&demo_config(), &dir.path().join("nope"), dir.path())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFound { what: "executable", .. }));
        assert!(!dir.path().join("Demo.app").exists());
    }

    #[tokio::test]
    async fn test_unsupported_icon_aborts_with_icon_context() {
        let dir = tempfile::tempdir().unwrap();
        let binary = write_binary(dir.path());
        let icon_path = dir.path().join("logo.bmp");
        std::fs::write(&icon_path, b"BM").unwrap();
        let config = BundleConfig::builder().name("Demo").icon(&icon_path).build().unwrap();

        let err = assemble_bundle(&config, &binary, dir.path()).await.unwrap_err();

        assert!(err.to_string().starts_with("icon: "));
        assert!(matches!(err.root_cause(), Error::UnsupportedFormat { .. }));
        assert!(!dir.path().join("Demo.app/Contents/Info.plist").exists());
    }

    #[tokio::test]
    async fn test_manifest_is_identical_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let binary = write_binary(dir.path());
        let first_out = dir.path().join("first");
        let second_out = dir.path().join("second");
        std::fs::create_dir(&first_out).unwrap();
        std::fs::create_dir(&second_out).unwrap();
        let config = BundleConfig::builder()
            .name("Demo")
            .author("Acme")
            .mode(BundleMode::Tray)
            .build()
            .unwrap();

        let first = assemble_bundle(&config, &binary, &first_out).await.unwrap();
        let second = assemble_bundle(&config, &binary, &second_out).await.unwrap();

        assert_eq!(
            std::fs::read(&first.manifest_path).unwrap(),
            std::fs::read(&second.manifest_path).unwrap()
        );
        assert_eq!(
            std::fs::read(&first.readme_path).unwrap(),
            README.as_bytes()
        );
    }

    #[tokio::test]
    async fn test_previous_bundle_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let binary = write_binary(dir.path());
        let stale = dir.path().join("Demo.app/Contents/Resources/stale.txt");
        std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
        std::fs::write(&stale, b"old").unwrap();

        assemble_bundle(&demo_config(), &binary, dir.path()).await.unwrap();

        assert!(!stale.exists());
    }
}
