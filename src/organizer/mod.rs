//! Per-video pipeline: find the file, scrape metadata, build the item
//! directory, write artifacts and move the video in.
//!
//! Each item runs up to `retry_count` attempts with a linearly growing
//! backoff. When an attempt fails after the directory has been populated,
//! the partial work is undone before the next attempt.

mod types;

pub use types::{
    BatchResult, CleanupError, ProcessingResult, Sleeper, Stage, StageError, ThreadSleeper,
    BATCH_STEP, BATCH_TASK, STEP_ATTEMPT, STEP_ROLLBACK,
};

use crate::api::{ApiError, Metadata, MetadataProvider};
use crate::artifacts::{CoverPipeline, SidecarWriter};
use crate::fileops::{FileRelocator, MoveOptions, LOCAL_TRASH_DIR};
use crate::parser::{extract_code, extract_codes};
use crate::scanner::{scan, MediaFile, ScanOptions, ScannerError};
use crate::tracker::StepTracker;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Everything the organizer depends on, supplied by the caller
pub struct OrganizerContext {
    pub source_root: PathBuf,
    pub output_root: PathBuf,
    pub scan_options: ScanOptions,
    pub provider: Box<dyn MetadataProvider>,
    pub sidecar: Box<dyn SidecarWriter>,
    pub covers: Box<dyn CoverPipeline>,
    pub relocator: Box<dyn FileRelocator>,
    pub tracker: Arc<StepTracker>,
    pub sleeper: Box<dyn Sleeper>,
    /// Attempts per item, including the first
    pub retry_count: u32,
    pub retry_delay: Duration,
    /// Stop after scraping and report the planned directory
    pub dry_run: bool,
}

pub struct Organizer {
    ctx: OrganizerContext,
}

impl Organizer {
    pub fn new(ctx: OrganizerContext) -> Self {
        Self { ctx }
    }

    pub fn tracker(&self) -> &Arc<StepTracker> {
        &self.ctx.tracker
    }

    /// Scan the source root once and process every code found in it
    pub fn process_all(&self) -> Result<BatchResult, ScannerError> {
        let files = self.scan_sources()?;
        let codes = extract_codes(&files);
        info!(files = files.len(), codes = codes.len(), "Derived codes from source directory");
        Ok(self.process_videos(&codes))
    }

    /// Process identifiers one after another, keeping input order
    pub fn process_videos<S: AsRef<str>>(&self, identifiers: &[S]) -> BatchResult {
        let tracker = &self.ctx.tracker;
        let mut batch = BatchResult::new(self.ctx.dry_run);

        tracker.start(
            BATCH_TASK,
            BATCH_STEP,
            format!("Processing {} videos", identifiers.len()),
        );

        for (i, identifier) in identifiers.iter().enumerate() {
            let identifier = identifier.as_ref();
            info!("[{}/{}] {}", i + 1, identifiers.len(), identifier);
            batch.push(self.process_video(identifier));
        }

        let summary = format!("{} succeeded, {} failed", batch.succeeded(), batch.failed());
        info!("{}", summary);
        if let Err(e) = tracker.complete(BATCH_TASK, BATCH_STEP, Some(&summary)) {
            warn!(error = %e, "Could not record batch completion");
        }

        batch
    }

    /// Run the pipeline for one identifier with retries
    pub fn process_video(&self, identifier: &str) -> ProcessingResult {
        if identifier.trim().is_empty() {
            warn!("Skipping empty identifier");
            return ProcessingResult::failed(identifier, "Empty video identifier");
        }

        let attempts = self.ctx.retry_count.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            self.ctx.tracker.start(
                identifier,
                STEP_ATTEMPT,
                format!("Attempt {}/{}", attempt, attempts),
            );

            match self.attempt(identifier) {
                Ok(result) => {
                    self.complete_step(identifier, STEP_ATTEMPT, None);
                    return result;
                }
                Err(e) => {
                    warn!(identifier, attempt, error = %e, "Attempt failed");
                    last_error = e.to_string();
                    self.fail_step(identifier, STEP_ATTEMPT, &last_error);

                    if attempt < attempts {
                        let delay = self.ctx.retry_delay * attempt;
                        debug!(identifier, ?delay, "Waiting before next attempt");
                        self.ctx.sleeper.sleep(delay);
                    }
                }
            }
        }

        ProcessingResult::failed(identifier, last_error)
    }

    fn attempt(&self, identifier: &str) -> Result<ProcessingResult, StageError> {
        let video = self.run_stage(
            identifier,
            Stage::Scan,
            || self.find_source(identifier),
            |video| format!("Found {}", video.name),
        )?;

        let metadata = self.run_stage(
            identifier,
            Stage::Scrape,
            || self.scrape(identifier),
            |metadata| format!("{} {}", metadata.code, metadata.title),
        )?;

        let target_dir = self.ctx.output_root.join(&metadata.code);

        if self.ctx.dry_run {
            info!(identifier, target = ?target_dir, "Dry run, leaving filesystem untouched");
            return Ok(ProcessingResult::succeeded(metadata.code, target_dir, video.path));
        }

        let placement = self.run_stage(
            identifier,
            Stage::CreateDir,
            || self.prepare_target(&target_dir),
            |placement| {
                if placement.created {
                    format!("Created {}", target_dir.display())
                } else {
                    format!("Using existing {}", target_dir.display())
                }
            },
        )?;

        let placed = self
            .run_stage(
                identifier,
                Stage::Artifacts,
                || self.write_artifacts(&metadata, &target_dir),
                |_| "NFO and covers written".to_string(),
            )
            .and_then(|_| {
                self.run_stage(
                    identifier,
                    Stage::Move,
                    || self.move_video(&video, &metadata.code, &target_dir),
                    |path| format!("Moved to {}", path.display()),
                )
            });

        match placed {
            Ok(_) => Ok(ProcessingResult::succeeded(metadata.code, target_dir, video.path)),
            Err(e) => {
                if e.needs_compensation() {
                    self.compensate(identifier, &video, &placement);
                }
                Err(e)
            }
        }
    }

    /// Record a stage around `op`: started, then completed or failed
    fn run_stage<T, F, M>(&self, task_id: &str, stage: Stage, op: F, summary: M) -> Result<T, StageError>
    where
        F: FnOnce() -> Result<T, StageError>,
        M: FnOnce(&T) -> String,
    {
        self.ctx
            .tracker
            .start(task_id, stage.as_str(), stage.start_message());

        match op() {
            Ok(value) => {
                self.complete_step(task_id, stage.as_str(), Some(&summary(&value)));
                Ok(value)
            }
            Err(err) => {
                self.fail_step(task_id, stage.as_str(), &err.to_string());
                Err(err)
            }
        }
    }

    fn complete_step(&self, task_id: &str, step: &str, message: Option<&str>) {
        if let Err(e) = self.ctx.tracker.complete(task_id, step, message) {
            warn!(error = %e, "Could not record step completion");
        }
    }

    fn fail_step(&self, task_id: &str, step: &str, error: &str) {
        if let Err(e) = self.ctx.tracker.fail(task_id, step, error) {
            warn!(error = %e, "Could not record step failure");
        }
    }

    fn scan_sources(&self) -> Result<Vec<MediaFile>, ScannerError> {
        let files = scan(&self.ctx.source_root, &self.ctx.scan_options)?;

        // Already organized and trashed files are not sources
        Ok(files
            .into_iter()
            .filter(|f| !f.path.starts_with(&self.ctx.output_root))
            .filter(|f| !f.path.iter().any(|c| c == LOCAL_TRASH_DIR))
            .collect())
    }

    /// A file whose extracted code equals the identifier wins over a
    /// file that merely contains it (`ABC-1` must not pick `abc-123.mp4`)
    fn find_source(&self, identifier: &str) -> Result<MediaFile, StageError> {
        let needle = identifier.to_lowercase();
        let files = self.scan_sources()?;

        let exact = files
            .iter()
            .position(|f| extract_code(&f.name).eq_ignore_ascii_case(identifier));
        let index = exact.or_else(|| {
            files
                .iter()
                .position(|f| f.name.to_lowercase().contains(&needle))
        });

        index
            .map(|i| files[i].clone())
            .ok_or_else(|| StageError::NotFound(format!("No video file matching {}", identifier)))
    }

    fn scrape(&self, identifier: &str) -> Result<Metadata, StageError> {
        let metadata = self.ctx.provider.get_video_info(identifier)?;

        // The code becomes a directory name below the output root
        let code = metadata.code.as_str();
        if code.is_empty() || code == "." || code == ".." || code.contains(['/', '\\']) {
            return Err(StageError::MetadataFetch(ApiError::ParseError(format!(
                "unusable catalog code {:?}",
                code
            ))));
        }

        Ok(metadata)
    }

    fn write_artifacts(&self, metadata: &Metadata, target_dir: &Path) -> Result<(), StageError> {
        let nfo_path = target_dir.join(format!("{}.nfo", metadata.code));
        self.ctx.sidecar.generate_sidecar(metadata, &nfo_path)?;
        self.ctx
            .covers
            .download_and_save_covers(&metadata.cover_url, target_dir)?;
        Ok(())
    }

    fn move_video(&self, video: &MediaFile, code: &str, target_dir: &Path) -> Result<PathBuf, StageError> {
        let extension = video
            .path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let new_name = format!("{}{}", code, extension);

        let options = MoveOptions {
            safe_delete: true,
            overwrite: false,
            new_name: Some(new_name.clone()),
        };

        let outcome = self.ctx.relocator.move_file(&video.path, target_dir, &options);
        if !outcome.success {
            return Err(StageError::Move(
                outcome.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        Ok(outcome.path.unwrap_or_else(|| target_dir.join(new_name)))
    }

    /// Create the target directory, remembering what was already in it
    fn prepare_target(&self, target_dir: &Path) -> Result<Placement, StageError> {
        let create_err = |source| StageError::CreateDir {
            path: target_dir.to_path_buf(),
            source,
        };

        let created = !target_dir.exists();
        fs::create_dir_all(target_dir).map_err(create_err)?;

        let mut existing = HashSet::new();
        if !created {
            for entry in fs::read_dir(target_dir).map_err(create_err)? {
                existing.insert(entry.map_err(create_err)?.file_name());
            }
        }

        Ok(Placement {
            dir: target_dir.to_path_buf(),
            created,
            existing,
        })
    }

    /// Undo a partial attempt. Failures are logged and swallowed.
    fn compensate(&self, task_id: &str, video: &MediaFile, placement: &Placement) {
        let tracker = &self.ctx.tracker;
        tracker.start(
            task_id,
            STEP_ROLLBACK,
            format!("Rolling back {}", placement.dir.display()),
        );

        match self.rollback(video, placement) {
            Ok(()) => self.complete_step(task_id, STEP_ROLLBACK, Some("Rolled back")),
            Err(e) => {
                warn!(task_id, error = %e, "Rollback failed");
                self.fail_step(task_id, STEP_ROLLBACK, &e.to_string());
            }
        }
    }

    /// Remove what the attempt added to the target directory.
    ///
    /// A video placed by the attempt goes back to its origin, other new
    /// entries are deleted, and the directory itself is removed only when
    /// the attempt created it. Entries present before the attempt are kept.
    fn rollback(&self, video: &MediaFile, placement: &Placement) -> Result<(), CleanupError> {
        let dir = &placement.dir;
        if !dir.exists() {
            return Ok(());
        }

        let inspect = |source| CleanupError::Inspect {
            path: dir.clone(),
            source,
        };

        let mut added = Vec::new();
        for entry in fs::read_dir(dir).map_err(inspect)? {
            let entry = entry.map_err(inspect)?;
            if !placement.existing.contains(&entry.file_name()) {
                added.push(entry.path());
            }
        }

        // Videos first: nothing is deleted while a placed video is unrestored
        added.sort_by_key(|path| !self.is_video_file(path));

        for path in added {
            if self.is_video_file(&path) {
                self.restore_video(video, &path)?;
            } else {
                remove_entry(&path)?;
            }
        }

        if placement.created {
            fs::remove_dir_all(dir).map_err(|source| CleanupError::RemoveDir {
                path: dir.clone(),
                source,
            })?;
            debug!(path = ?dir, "Removed target directory");
        }

        Ok(())
    }

    fn is_video_file(&self, path: &Path) -> bool {
        path.is_file()
            && path
                .file_name()
                .map(|n| self.ctx.scan_options.is_video(&n.to_string_lossy()))
                .unwrap_or(false)
    }

    fn restore_video(&self, video: &MediaFile, placed: &Path) -> Result<(), CleanupError> {
        if video.path.exists() {
            // The origin survived (copy without delete); drop the copy
            return remove_entry(placed);
        }

        let options = MoveOptions {
            safe_delete: false,
            overwrite: false,
            new_name: Some(video.name.clone()),
        };

        let outcome = self.ctx.relocator.move_file(placed, video.parent(), &options);
        if !outcome.success {
            return Err(CleanupError::Restore {
                path: placed.to_path_buf(),
                message: outcome.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        info!(from = ?placed, to = ?outcome.path, "Restored video");
        Ok(())
    }
}

/// Target directory of an attempt and what it held beforehand
struct Placement {
    dir: PathBuf,
    /// The attempt created the directory
    created: bool,
    existing: HashSet<OsString>,
}

fn remove_entry(path: &Path) -> Result<(), CleanupError> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    result.map_err(|source| CleanupError::RemoveDir {
        path: path.to_path_buf(),
        source,
    })
}
