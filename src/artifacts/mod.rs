//! Files generated next to an organized video: the NFO sidecar and cover art.

mod covers;
mod nfo;

pub use covers::{cover_extension, split_cover, CoverDownloader};
pub use nfo::{render_nfo, NfoWriter};

use crate::api::Metadata;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Invalid cover URL: {0:?}")]
    InvalidCoverUrl(String),

    #[error("Cover download failed: {0}")]
    Download(String),

    #[error("Cover image could not be processed: {0}")]
    Image(String),

    #[error("Failed to build sidecar XML: {0}")]
    Xml(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes the metadata sidecar file for a video
pub trait SidecarWriter {
    fn generate_sidecar(&self, metadata: &Metadata, output_path: &Path) -> Result<(), ArtifactError>;
}

/// Fetches cover art and derives the poster from it
pub trait CoverPipeline {
    fn download_and_save_covers(&self, cover_url: &str, output_dir: &Path) -> Result<(), ArtifactError>;
}
