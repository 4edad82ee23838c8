use crate::api::ApiError;
use crate::artifacts::ArtifactError;
use crate::scanner::ScannerError;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Step key for one pass through the pipeline
pub const STEP_ATTEMPT: &str = "attempt";
/// Step key for compensation after a failed attempt
pub const STEP_ROLLBACK: &str = "rollback";
/// Task id for batch-level progress
pub const BATCH_TASK: &str = "batch";
pub const BATCH_STEP: &str = "process";

/// Pipeline stages of a single item, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Scan,
    Scrape,
    CreateDir,
    Artifacts,
    Move,
}

impl Stage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Scrape => "scrape",
            Self::CreateDir => "create_dir",
            Self::Artifacts => "artifacts",
            Self::Move => "move",
        }
    }

    pub const fn start_message(self) -> &'static str {
        match self {
            Self::Scan => "Looking for the video file",
            Self::Scrape => "Fetching catalog metadata",
            Self::CreateDir => "Creating target directory",
            Self::Artifacts => "Writing NFO and covers",
            Self::Move => "Moving video file",
        }
    }
}

/// Why a single attempt failed
#[derive(Error, Debug)]
pub enum StageError {
    #[error("{0}")]
    NotFound(String),

    #[error("Source scan failed: {0}")]
    Scan(#[from] ScannerError),

    #[error("Failed to fetch metadata: {0}")]
    MetadataFetch(ApiError),

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write artifacts: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Failed to move video: {0}")]
    Move(String),
}

impl StageError {
    /// Failures after the target directory was populated
    pub fn needs_compensation(&self) -> bool {
        matches!(self, StageError::Artifact(_) | StageError::Move(_))
    }
}

impl From<ApiError> for StageError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotFound(code) => StageError::NotFound(format!("No catalog entry for {}", code)),
            other => StageError::MetadataFetch(other),
        }
    }
}

/// Failure while undoing a partial attempt; logged, never reported as the
/// item's error
#[derive(Error, Debug)]
pub enum CleanupError {
    #[error("Failed to inspect {path}: {source}")]
    Inspect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to restore {path}: {message}")]
    Restore { path: PathBuf, message: String },

    #[error("Failed to remove {path}: {source}")]
    RemoveDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of one identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingResult {
    pub success: bool,
    /// Canonical catalog code on success, the searched identifier otherwise
    pub code: String,
    /// Target directory (planned directory in dry-run mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Video file the identifier resolved to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessingResult {
    pub fn succeeded(code: impl Into<String>, path: PathBuf, source: PathBuf) -> Self {
        Self {
            success: true,
            code: code.into(),
            path: Some(path),
            source: Some(source),
            error: None,
        }
    }

    pub fn failed(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            code: code.into(),
            path: None,
            source: None,
            error: Some(error.into()),
        }
    }
}

/// Results of a batch in input order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub dry_run: bool,
    pub results: Vec<ProcessingResult>,
}

impl BatchResult {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            results: Vec::new(),
        }
    }

    pub fn push(&mut self, result: ProcessingResult) {
        self.results.push(result);
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Blocking wait between attempts
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        let names: Vec<&str> = [
            Stage::Scan,
            Stage::Scrape,
            Stage::CreateDir,
            Stage::Artifacts,
            Stage::Move,
        ]
        .iter()
        .map(|s| s.as_str())
        .collect();

        assert_eq!(names, vec!["scan", "scrape", "create_dir", "artifacts", "move"]);
    }

    #[test]
    fn test_compensation_only_after_artifacts() {
        assert!(StageError::Move("x".to_string()).needs_compensation());
        assert!(StageError::Artifact(ArtifactError::Xml("x".to_string())).needs_compensation());
        assert!(!StageError::NotFound("x".to_string()).needs_compensation());
        assert!(!StageError::MetadataFetch(ApiError::Timeout).needs_compensation());
    }

    #[test]
    fn test_catalog_not_found_maps_to_not_found() {
        let err: StageError = ApiError::NotFound("ABC-123".to_string()).into();
        assert!(matches!(err, StageError::NotFound(_)));

        let err: StageError = ApiError::RateLimited.into();
        assert!(matches!(err, StageError::MetadataFetch(ApiError::RateLimited)));
    }

    #[test]
    fn test_batch_counts() {
        let mut batch = BatchResult::new(false);
        batch.push(ProcessingResult::succeeded("A-1", PathBuf::from("/o/A-1"), PathBuf::from("/s/a-1.mp4")));
        batch.push(ProcessingResult::failed("B-2", "boom"));

        assert_eq!(batch.succeeded(), 1);
        assert_eq!(batch.failed(), 1);
    }

    #[test]
    fn test_result_serialization_skips_empty_fields() {
        let json = serde_json::to_string(&ProcessingResult::failed("B-2", "boom")).unwrap();
        assert_eq!(json, r#"{"success":false,"code":"B-2","error":"boom"}"#);
    }
}
