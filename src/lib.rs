pub mod api;
pub mod artifacts;
pub mod cli;
pub mod config;
pub mod error;
pub mod fileops;
pub mod logging;
pub mod organizer;
pub mod output;
pub mod parser;
pub mod progress;
pub mod scanner;
pub mod tracker;

pub use api::{ApiConfig, ApiError, JavdbClient, MatchStrictness, Metadata, MetadataProvider};
pub use artifacts::{ArtifactError, CoverDownloader, CoverPipeline, NfoWriter, SidecarWriter};
pub use config::{Config, ConfigError};
pub use error::{AppError, ExitCode};
pub use fileops::{FileRelocator, FsRelocator, MoveOptions, MoveOutcome};
pub use organizer::{
    BatchResult, Organizer, OrganizerContext, ProcessingResult, Sleeper, StageError, ThreadSleeper,
};
pub use parser::{extract_code, extract_codes};
pub use scanner::{scan, MediaFile, ScanOptions, ScannerError};
pub use tracker::{StepEvent, StepListener, StepRecord, StepStatus, StepTracker, TrackerError};
