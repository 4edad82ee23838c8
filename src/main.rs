use clap::Parser;
use javdb2folder::cli::Args;
use javdb2folder::output::{display_dry_run, display_execution_result, display_json};
use javdb2folder::progress::{should_use_colors, Progress};
use javdb2folder::{
    logging, AppError, Config, CoverDownloader, FsRelocator, JavdbClient, NfoWriter, Organizer,
    OrganizerContext, StepTracker, ThreadSleeper,
};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    if let Err(e) = run(args) {
        error!("{}", e);
        eprintln!("\nError: {}", e.detailed_message());
        std::process::exit(e.exit_code().into());
    }
}

fn run(args: Args) -> Result<(), AppError> {
    let config = load_config(&args)?;

    let log_file = config.logging.enabled.then_some(config.logging.path.as_path());
    logging::init(args.verbose, log_file).map_err(|source| AppError::LogFile {
        path: config.logging.path.clone(),
        source,
    })?;

    debug!(?config, "Configuration loaded");

    let source = &config.base.source_dir;
    if !source.exists() {
        return Err(AppError::DirectoryNotFound { path: source.clone() });
    }
    if !source.is_dir() {
        return Err(AppError::NotADirectory { path: source.clone() });
    }

    let tracker = Arc::new(StepTracker::new());
    tracker.add_listener(Box::new(Progress::new_with_ui(
        args.verbose > 0,
        should_use_colors(),
    )));

    let organizer = Organizer::new(build_context(&config, tracker, args.dry)?);

    let batch = if args.codes.is_empty() {
        info!("No codes given, scanning {:?}", source);
        organizer.process_all()?
    } else {
        organizer.process_videos(args.codes.as_slice())
    };

    let mut stdout = io::stdout();
    let shown = if args.json {
        display_json(&batch, &mut stdout)
    } else if args.dry {
        display_dry_run(&batch, &mut stdout)
    } else {
        display_execution_result(&batch, &mut stdout)
    };
    shown.map_err(|e| AppError::Other(format!("Failed to display output: {}", e)))?;

    if batch.failed() > 0 {
        return Err(AppError::PartialFailure {
            failed: batch.failed(),
            total: batch.results.len(),
        });
    }

    Ok(())
}

/// Config file, then environment, then command line
fn load_config(args: &Args) -> Result<Config, AppError> {
    let mut config = Config::load(args.config.as_deref())?;
    config.apply_env_overrides();

    if let Some(source) = &args.source {
        config.base.source_dir = source.clone();
    }
    if let Some(output) = &args.output {
        config.base.output_dir = output.clone();
    }
    if let Some(retries) = args.retries {
        config.organizer.retry_count = retries;
    }

    let cwd = std::env::current_dir()
        .map_err(|e| AppError::Other(format!("Cannot determine working directory: {}", e)))?;
    config.resolve_paths(&cwd);
    config.validate()?;

    Ok(config)
}

fn build_context(
    config: &Config,
    tracker: Arc<StepTracker>,
    dry_run: bool,
) -> Result<OrganizerContext, AppError> {
    let api = &config.scraper.javdb;

    Ok(OrganizerContext {
        source_root: config.base.source_dir.clone(),
        output_root: config.base.output_dir.clone(),
        scan_options: config.scan_options(),
        provider: Box::new(JavdbClient::new(api.clone())?),
        sidecar: Box::new(NfoWriter),
        covers: Box::new(CoverDownloader::new(api.image_timeout_ms, &api.user_agent)?),
        relocator: Box::new(FsRelocator::new(config.trash_dir())),
        tracker,
        sleeper: Box::new(ThreadSleeper),
        retry_count: config.organizer.retry_count,
        retry_delay: Duration::from_millis(config.organizer.retry_delay_ms),
        dry_run,
    })
}
