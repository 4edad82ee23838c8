//! Moving files between directories.
//!
//! Same-device moves are a plain rename. Cross-device moves copy the file and
//! then delete the origin, either permanently or by parking it in a trash
//! directory so it can still be recovered.

use chrono::Utc;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directory name used for trash next to the origin when the configured
/// trash directory lives on another device. Scans skip it.
pub const LOCAL_TRASH_DIR: &str = ".javdb2folder-trash";

#[derive(Debug, Clone)]
pub struct MoveOptions {
    /// Send the origin to the trash instead of unlinking it (cross-device only)
    pub safe_delete: bool,
    /// Replace an existing file with the same name instead of picking a free one
    pub overwrite: bool,
    /// File name in the target directory; defaults to the source name
    pub new_name: Option<String>,
}

impl Default for MoveOptions {
    fn default() -> Self {
        Self {
            safe_delete: true,
            overwrite: false,
            new_name: None,
        }
    }
}

/// Result of a relocation. Failures are reported as data, never panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub success: bool,
    pub path: Option<PathBuf>,
    pub error: Option<String>,
}

impl MoveOutcome {
    pub fn moved(path: PathBuf) -> Self {
        Self {
            success: true,
            path: Some(path),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            path: None,
            error: Some(error.into()),
        }
    }
}

pub trait FileRelocator {
    fn move_file(&self, source: &Path, target_dir: &Path, options: &MoveOptions) -> MoveOutcome;
}

/// Relocator backed by the local filesystem
#[derive(Debug, Clone)]
pub struct FsRelocator {
    trash_dir: PathBuf,
}

impl FsRelocator {
    pub fn new(trash_dir: PathBuf) -> Self {
        Self { trash_dir }
    }

    /// Trash directory under the user's data directory
    pub fn default_trash_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("javdb2folder")
            .join("trash")
    }

    fn try_move(&self, source: &Path, target_dir: &Path, options: &MoveOptions) -> io::Result<PathBuf> {
        if !source.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Source file does not exist: {}", source.display()),
            ));
        }

        fs::create_dir_all(target_dir)?;

        let file_name = match &options.new_name {
            Some(name) => name.clone(),
            None => source
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "Source has no file name")
                })?,
        };

        let target = if options.overwrite {
            target_dir.join(&file_name)
        } else {
            unique_target(target_dir, &file_name)
        };

        let renamed = same_device(source, target_dir)?
            && match fs::rename(source, &target) {
                Ok(()) => {
                    debug!(from = ?source, to = ?target, "Renamed on the same device");
                    true
                }
                Err(e) if is_cross_device(&e) => false,
                Err(e) => return Err(e),
            };

        if !renamed {
            debug!(from = ?source, to = ?target, "Copying across devices");
            fs::copy(source, &target)?;
            if options.safe_delete {
                self.trash(source)?;
            } else {
                fs::remove_file(source)?;
            }
        }

        Ok(target)
    }

    /// Park a file in the trash directory under a timestamped name
    fn trash(&self, path: &Path) -> io::Result<PathBuf> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let stamped = format!("{}-{}", Utc::now().format("%Y%m%d-%H%M%S%3f"), name);

        fs::create_dir_all(&self.trash_dir)?;
        let destination = unique_target(&self.trash_dir, &stamped);

        match fs::rename(path, &destination) {
            Ok(()) => {
                info!(from = ?path, to = ?destination, "Moved origin to trash");
                Ok(destination)
            }
            Err(e) => {
                // Trash is on another device; keep the file on its own volume
                let local = path
                    .parent()
                    .map(|p| p.join(LOCAL_TRASH_DIR))
                    .unwrap_or_else(|| PathBuf::from(LOCAL_TRASH_DIR));
                warn!(error = %e, fallback = ?local, "Trash unreachable, using local trash");
                fs::create_dir_all(&local)?;
                let destination = unique_target(&local, &stamped);
                fs::rename(path, &destination)?;
                Ok(destination)
            }
        }
    }
}

impl FileRelocator for FsRelocator {
    fn move_file(&self, source: &Path, target_dir: &Path, options: &MoveOptions) -> MoveOutcome {
        match self.try_move(source, target_dir, options) {
            Ok(path) => {
                info!(from = ?source, to = ?path, "Moved file");
                MoveOutcome::moved(path)
            }
            Err(e) => {
                warn!(from = ?source, target_dir = ?target_dir, error = %e, "Move failed");
                MoveOutcome::failed(e.to_string())
            }
        }
    }
}

/// First free path for `file_name` in `dir`, appending " (n)" before the
/// extension on collision
pub fn unique_target(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let as_path = Path::new(file_name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.to_string());
    let ext = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1;
    loop {
        let candidate = dir.join(format!("{} ({}){}", stem, counter, ext));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(unix)]
fn same_device(source: &Path, target_dir: &Path) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;
    Ok(fs::metadata(source)?.dev() == fs::metadata(target_dir)?.dev())
}

#[cfg(not(unix))]
fn same_device(_source: &Path, _target_dir: &Path) -> io::Result<bool> {
    Ok(true)
}

/// The rename crossed a mount point (EXDEV) or volume (ERROR_NOT_SAME_DEVICE)
#[cfg(unix)]
fn is_cross_device(err: &io::Error) -> bool {
    const EXDEV: i32 = 18;
    err.raw_os_error() == Some(EXDEV)
}

#[cfg(windows)]
fn is_cross_device(err: &io::Error) -> bool {
    const ERROR_NOT_SAME_DEVICE: i32 = 17;
    err.raw_os_error() == Some(ERROR_NOT_SAME_DEVICE)
}

#[cfg(not(any(unix, windows)))]
fn is_cross_device(_err: &io::Error) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn relocator(root: &Path) -> FsRelocator {
        FsRelocator::new(root.join("trash"))
    }

    #[test]
    fn test_move_into_new_directory() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("clip.mp4");
        fs::write(&source, "video").unwrap();
        let target_dir = dir.path().join("out/ABC-123");

        let outcome =
            relocator(dir.path()).move_file(&source, &target_dir, &MoveOptions::default());

        assert!(outcome.success);
        assert_eq!(outcome.path, Some(target_dir.join("clip.mp4")));
        assert!(!source.exists());
        assert_eq!(fs::read_to_string(target_dir.join("clip.mp4")).unwrap(), "video");
    }

    #[test]
    fn test_collisions_get_numbered_names() {
        let dir = tempdir().unwrap();
        let target_dir = dir.path().join("target");
        let first = dir.path().join("a/cover.jpg");
        let second = dir.path().join("b/cover.jpg");
        fs::create_dir_all(first.parent().unwrap()).unwrap();
        fs::create_dir_all(second.parent().unwrap()).unwrap();
        fs::write(&first, "first").unwrap();
        fs::write(&second, "second").unwrap();

        let relocator = relocator(dir.path());
        let options = MoveOptions::default();
        let a = relocator.move_file(&first, &target_dir, &options);
        let b = relocator.move_file(&second, &target_dir, &options);

        assert_eq!(a.path, Some(target_dir.join("cover.jpg")));
        assert_eq!(b.path, Some(target_dir.join("cover (1).jpg")));
        assert_eq!(fs::read_to_string(target_dir.join("cover.jpg")).unwrap(), "first");
        assert_eq!(
            fs::read_to_string(target_dir.join("cover (1).jpg")).unwrap(),
            "second"
        );
    }

    #[test]
    fn test_counter_keeps_incrementing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("x.mp4"), "").unwrap();
        fs::write(dir.path().join("x (1).mp4"), "").unwrap();

        assert_eq!(unique_target(dir.path(), "x.mp4"), dir.path().join("x (2).mp4"));
        assert_eq!(unique_target(dir.path(), "y.mp4"), dir.path().join("y.mp4"));
    }

    #[test]
    fn test_collision_without_extension() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("README"), "").unwrap();
        assert_eq!(unique_target(dir.path(), "README"), dir.path().join("README (1)"));
    }

    #[test]
    fn test_overwrite_replaces_existing() {
        let dir = tempdir().unwrap();
        let target_dir = dir.path().join("target");
        fs::create_dir(&target_dir).unwrap();
        fs::write(target_dir.join("clip.mp4"), "old").unwrap();
        let source = dir.path().join("clip.mp4");
        fs::write(&source, "new").unwrap();

        let options = MoveOptions {
            overwrite: true,
            ..Default::default()
        };
        let outcome = relocator(dir.path()).move_file(&source, &target_dir, &options);

        assert_eq!(outcome.path, Some(target_dir.join("clip.mp4")));
        assert_eq!(fs::read_to_string(target_dir.join("clip.mp4")).unwrap(), "new");
        assert!(!target_dir.join("clip (1).mp4").exists());
    }

    #[test]
    fn test_new_name_is_applied() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("abc-123 1080p.mp4");
        fs::write(&source, "video").unwrap();
        let target_dir = dir.path().join("ABC-123");

        let options = MoveOptions {
            new_name: Some("ABC-123.mp4".to_string()),
            ..Default::default()
        };
        let outcome = relocator(dir.path()).move_file(&source, &target_dir, &options);

        assert_eq!(outcome.path, Some(target_dir.join("ABC-123.mp4")));
    }

    #[test]
    fn test_missing_source_is_reported_not_panicked() {
        let dir = tempdir().unwrap();
        let outcome = relocator(dir.path()).move_file(
            &dir.path().join("missing.mp4"),
            &dir.path().join("target"),
            &MoveOptions::default(),
        );

        assert!(!outcome.success);
        assert!(outcome.path.is_none());
        assert!(outcome.error.unwrap().contains("does not exist"));
    }

    #[test]
    fn test_trash_keeps_file_recoverable() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("origin.mp4");
        fs::write(&source, "keep me").unwrap();

        let relocator = relocator(dir.path());
        let trashed = relocator.trash(&source).unwrap();

        assert!(!source.exists());
        assert!(trashed.starts_with(dir.path().join("trash")));
        assert!(trashed.to_string_lossy().ends_with("-origin.mp4"));
        assert_eq!(fs::read_to_string(trashed).unwrap(), "keep me");
    }

    #[test]
    #[cfg(unix)]
    fn test_exdev_is_cross_device() {
        assert!(is_cross_device(&io::Error::from_raw_os_error(18)));
        assert!(!is_cross_device(&io::Error::from_raw_os_error(13)));
    }

    #[test]
    #[cfg(windows)]
    fn test_not_same_device_is_cross_device() {
        assert!(is_cross_device(&io::Error::from_raw_os_error(17)));
        assert!(!is_cross_device(&io::Error::from_raw_os_error(5)));
    }

    #[test]
    fn test_plain_errors_are_not_cross_device() {
        assert!(!is_cross_device(&io::Error::new(io::ErrorKind::Other, "nope")));
    }
}
