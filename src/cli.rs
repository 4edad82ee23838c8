use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "javdb2folder")]
#[command(author, version, about, long_about = None)]
#[command(about = "Organize video files into per-code folders with NFO metadata and covers")]
pub struct Args {
    /// Video codes to process; all videos in the source directory when omitted
    pub codes: Vec<String>,

    /// Config file (YAML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Source directory to scan for videos
    #[arg(short, long, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Output directory for organized folders
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Attempts per video
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub retries: Option<u32>,

    /// Resolve files and metadata without modifying the filesystem
    #[arg(short, long)]
    pub dry: bool,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
