//! File system utilities for bundling.
//!
//! Holds the recursive tree copier used to populate a mounted disk image, plus
//! small async helpers used during bundle assembly.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::{
    fs::{self as std_fs, File, OpenOptions},
    io,
    path::Path,
};
use tokio::fs;

/// Creates all of the directories of the specified path, erasing it first if specified.
pub async fn create_dir_all(path: &Path, erase: bool) -> Result<()> {
    if erase {
        remove_dir_all(path).await?;
    }
    fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)
}

/// Removes the directory and its contents if it exists.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    if fs::try_exists(path).await.unwrap_or(false) {
        fs::remove_dir_all(path)
            .await
            .fs_context("removing directory", path)?;
    }
    Ok(())
}

/// Total size in bytes of all regular files beneath `path`.
///
/// A plain file reports its own length. Symlinks are not followed.
pub fn dir_footprint(path: &Path) -> Result<u64> {
    let mut total = 0u64;
    for entry in walkdir::WalkDir::new(path).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

/// Makes a deep copy of `from` into `to`.
///
/// The tree is mirrored under `to/<file name of from>`, so copying `Demo.app`
/// into a mount point yields `<mount>/Demo.app/...`. The walk is depth-first
/// and pre-order:
///
/// - directories are created with the source's permission bits unless they
///   already exist;
/// - files are created exclusively (an existing destination yields
///   [`Error::DestinationExists`]), receive the source's permission bits and are
///   synced to disk before the walk moves on;
/// - symlinks are recreated as symlinks on unix;
/// - entries with an empty name are skipped, together with their subtree.
///
/// The first failing entry aborts the whole walk.
pub fn deep_copy(from: &Path, to: &Path) -> Result<()> {
    if from.as_os_str().is_empty() || to.as_os_str().is_empty() {
        crate::bail!("no source or no destination; both required");
    }

    let base = from.parent().unwrap_or_else(|| Path::new(""));
    let mut walker = walkdir::WalkDir::new(from).follow_links(false).into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry?;
        let file_type = entry.file_type();

        if entry.file_name().is_empty() {
            if file_type.is_dir() {
                walker.skip_current_dir();
            }
            continue;
        }

        let dest = to.join(entry.path().strip_prefix(base)?);

        if file_type.is_dir() {
            if !dest.exists() {
                let permissions = entry.metadata()?.permissions();
                create_mirrored_dir(&dest, &permissions)?;
            }
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &dest)?;
        } else {
            log::debug!("Copying {} to {}", entry.path().display(), dest.display());
            copy_file_exclusive(entry.path(), &dest)?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn create_mirrored_dir(dest: &Path, permissions: &std_fs::Permissions) -> Result<()> {
    use std::os::unix::fs::{DirBuilderExt, PermissionsExt};

    std_fs::DirBuilder::new()
        .mode(permissions.mode() & 0o7777)
        .create(dest)
        .fs_context("creating directory", dest)
}

#[cfg(not(unix))]
fn create_mirrored_dir(dest: &Path, _permissions: &std_fs::Permissions) -> Result<()> {
    std_fs::create_dir(dest).fs_context("creating directory", dest)
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    let target = std_fs::read_link(src).fs_context("reading symlink", src)?;
    std::os::unix::fs::symlink(&target, dest).map_err(|error| {
        if error.kind() == io::ErrorKind::AlreadyExists {
            Error::DestinationExists {
                path: dest.to_path_buf(),
            }
        } else {
            Error::Fs {
                context: "creating symlink",
                path: dest.to_path_buf(),
                error,
            }
        }
    })
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    copy_file_exclusive(src, dest)
}

/// Copies one regular file, refusing to overwrite and syncing before returning.
fn copy_file_exclusive(from: &Path, to: &Path) -> Result<()> {
    let mut src = File::open(from).fs_context("opening source file", from)?;
    let permissions = src
        .metadata()
        .fs_context("reading source metadata", from)?
        .permissions();

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(permissions.mode() & 0o7777);
    }

    let mut dest = options.open(to).map_err(|error| {
        if error.kind() == io::ErrorKind::AlreadyExists {
            Error::DestinationExists {
                path: to.to_path_buf(),
            }
        } else {
            Error::Fs {
                context: "creating destination file",
                path: to.to_path_buf(),
                error,
            }
        }
    })?;

    io::copy(&mut src, &mut dest).fs_context("copying file contents to", to)?;
    // create_new's mode is filtered through the umask
    dest.set_permissions(permissions)
        .fs_context("setting permissions on", to)?;
    dest.sync_all().fs_context("flushing", to)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(path: &Path, contents: &[u8]) {
        std_fs::create_dir_all(path.parent().unwrap()).unwrap();
        std_fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_deep_copy_mirrors_tree_under_source_name() {
        let src_root = tempfile::tempdir().unwrap();
        let dst_root = tempfile::tempdir().unwrap();
        let app = src_root.path().join("Demo.app");

        write_file(&app.join("Contents/Info.plist"), b"<plist/>");
        write_file(&app.join("Contents/MacOS/Demo.app"), b"\x7fELF binary");
        std_fs::create_dir_all(app.join("Contents/Resources")).unwrap();

        deep_copy(&app, dst_root.path()).unwrap();

        let copied = dst_root.path().join("Demo.app");
        assert_eq!(
            std_fs::read(copied.join("Contents/Info.plist")).unwrap(),
            b"<plist/>"
        );
        assert_eq!(
            std_fs::read(copied.join("Contents/MacOS/Demo.app")).unwrap(),
            b"\x7fELF binary"
        );
        assert!(copied.join("Contents/Resources").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_deep_copy_preserves_permission_bits() {
        use std::os::unix::fs::PermissionsExt;

        let src_root = tempfile::tempdir().unwrap();
        let dst_root = tempfile::tempdir().unwrap();
        let app = src_root.path().join("Demo.app");
        let exe = app.join("Contents/MacOS/Demo.app");
        let readme = app.join("Contents/README");
        write_file(&exe, b"bin");
        write_file(&readme, b"readme");
        std_fs::set_permissions(&exe, std_fs::Permissions::from_mode(0o755)).unwrap();
        std_fs::set_permissions(&readme, std_fs::Permissions::from_mode(0o640)).unwrap();

        deep_copy(&app, dst_root.path()).unwrap();

        let mode = |p: &Path| std_fs::metadata(p).unwrap().permissions().mode() & 0o777;
        let copied = dst_root.path().join("Demo.app");
        assert_eq!(mode(&copied.join("Contents/MacOS/Demo.app")), 0o755);
        assert_eq!(mode(&copied.join("Contents/README")), 0o640);
    }

    #[test]
    fn test_deep_copy_refuses_to_overwrite() {
        let src_root = tempfile::tempdir().unwrap();
        let dst_root = tempfile::tempdir().unwrap();
        let app = src_root.path().join("Demo.app");
        write_file(&app.join("Contents/README"), b"readme");

        deep_copy(&app, dst_root.path()).unwrap();
        let err = deep_copy(&app, dst_root.path()).unwrap_err();

        match err {
            Error::DestinationExists { path } => {
                assert_eq!(path, dst_root.path().join("Demo.app/Contents/README"));
            }
            other => panic!("expected DestinationExists, got {other:?}"),
        }
        assert_eq!(
            std_fs::read(dst_root.path().join("Demo.app/Contents/README")).unwrap(),
            b"readme"
        );
    }

    #[test]
    fn test_deep_copy_requires_both_paths() {
        let dir = tempfile::tempdir().unwrap();
        assert!(deep_copy(Path::new(""), dir.path()).is_err());
        assert!(deep_copy(dir.path(), Path::new("")).is_err());
    }

    #[test]
    fn test_deep_copy_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = deep_copy(&dir.path().join("Missing.app"), dir.path()).unwrap_err();
        assert!(matches!(err, Error::WalkdirError(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_deep_copy_recreates_symlinks() {
        let src_root = tempfile::tempdir().unwrap();
        let dst_root = tempfile::tempdir().unwrap();
        let app = src_root.path().join("Demo.app");
        write_file(&app.join("Contents/Resources/real.txt"), b"data");
        std::os::unix::fs::symlink("real.txt", app.join("Contents/Resources/link.txt")).unwrap();

        deep_copy(&app, dst_root.path()).unwrap();

        let link = dst_root.path().join("Demo.app/Contents/Resources/link.txt");
        assert!(std_fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(std_fs::read_link(&link).unwrap(), Path::new("real.txt"));
    }

    #[test]
    fn test_dir_footprint_sums_file_sizes() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("a"), &[0u8; 100]);
        write_file(&dir.path().join("sub/b"), &[0u8; 28]);
        assert_eq!(dir_footprint(dir.path()).unwrap(), 128);
    }

    #[tokio::test]
    async fn test_create_dir_all_erase_clears_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");
        write_file(&target.join("stale"), b"old");

        create_dir_all(&target, true).await.unwrap();

        assert!(target.is_dir());
        assert!(!target.join("stale").exists());
    }
}
