use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace, warn};

#[derive(Error, Debug)]
pub enum ScannerError {
    #[error("Path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// A candidate video file found during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub name: String,
}

impl MediaFile {
    pub fn new(path: PathBuf, name: String) -> Self {
        Self { path, name }
    }

    /// Directory containing the file
    pub fn parent(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

/// Rules deciding which entries a scan visits and yields
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Lowercase extensions including the leading dot, e.g. ".mp4"
    pub extensions: HashSet<String>,
    pub skip_hidden: bool,
    pub exclude_dirs: HashSet<String>,
}

impl ScanOptions {
    pub fn new<E, D>(extensions: E, skip_hidden: bool, exclude_dirs: D) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| normalize_extension(e.as_ref()))
                .collect(),
            skip_hidden,
            exclude_dirs: exclude_dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether a file name carries one of the allowed extensions
    pub fn is_video(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .map(|ext| {
                let ext = format!(".{}", ext.to_string_lossy().to_lowercase());
                self.extensions.contains(&ext)
            })
            .unwrap_or(false)
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

/// Recursively collect video files below `root`.
///
/// Only problems with `root` itself are errors. A subdirectory that cannot be
/// read is logged and skipped; everything found elsewhere is still returned.
pub fn scan(root: &Path, options: &ScanOptions) -> Result<Vec<MediaFile>, ScannerError> {
    debug!(path = ?root, "Scanning for video files");

    if !root.exists() {
        return Err(ScannerError::PathNotFound(root.to_path_buf()));
    }

    if !root.is_dir() {
        return Err(ScannerError::NotADirectory(root.to_path_buf()));
    }

    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let children = scan_dir(&dir, options, &mut files);
        // Reverse so the first subdirectory is visited next (depth-first, entry order)
        pending.extend(children.into_iter().rev());
    }

    debug!(count = files.len(), "Scan complete");

    Ok(files)
}

/// Read one directory, pushing matching files and returning the
/// subdirectories still to visit.
fn scan_dir(dir: &Path, options: &ScanOptions, files: &mut Vec<MediaFile>) -> Vec<PathBuf> {
    let read_dir = match fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) => {
            warn!(path = ?dir, error = %e, "Failed to read directory, skipping subtree");
            return Vec::new();
        }
    };

    let mut subdirs = Vec::new();

    for entry in read_dir {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = ?dir, error = %e, "Failed to read directory entry");
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().to_string();

        if options.skip_hidden && name.starts_with('.') {
            trace!(name = %name, "Skipping hidden entry");
            continue;
        }

        let file_type = match entry.file_type() {
            Ok(ft) => ft,
            Err(e) => {
                warn!(name = %name, error = %e, "Failed to stat entry");
                continue;
            }
        };

        let path = entry.path();

        if file_type.is_dir() {
            if options.exclude_dirs.contains(&name) {
                debug!(name = %name, "Pruning excluded directory");
                continue;
            }
            subdirs.push(path);
        } else if file_type.is_file() && options.is_video(&name) {
            trace!(path = ?path, "Found video file");
            files.push(MediaFile::new(path, name));
        }
    }

    subdirs
}
