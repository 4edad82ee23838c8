use crate::organizer::{BatchResult, ProcessingResult};
use std::io::{self, Write};

/// Display dry run results in a formatted output
pub fn display_dry_run(batch: &BatchResult, writer: &mut impl Write) -> io::Result<()> {
    writeln!(writer)?;
    writeln!(writer, "========================================")?;
    writeln!(writer, "              DRY RUN")?;
    writeln!(writer, "========================================")?;
    writeln!(writer)?;

    if batch.is_empty() {
        writeln!(writer, "No videos to organize.")?;
        return Ok(());
    }

    writeln!(writer, "Planned changes:")?;
    writeln!(writer)?;

    for (i, result) in batch.results.iter().enumerate() {
        writeln!(writer, "  {}. {}", i + 1, result.code)?;
        match (&result.source, &result.path, &result.error) {
            (Some(source), Some(path), _) => {
                writeln!(writer, "     From: {}", source.display())?;
                writeln!(writer, "     To:   {}", path.display())?;
            }
            (_, _, Some(error)) => writeln!(writer, "     [!] {}", error)?,
            _ => {}
        }
        writeln!(writer)?;
    }

    writeln!(writer, "----------------------------------------")?;
    writeln!(writer, "Summary:")?;
    writeln!(writer, "  {} videos would be organized", batch.succeeded())?;
    if batch.failed() > 0 {
        writeln!(writer, "  {} videos could not be resolved", batch.failed())?;
    }

    writeln!(writer)?;
    writeln!(writer, "Run without --dry to apply these changes.")?;

    Ok(())
}

/// Display execution results (non-dry-run)
pub fn display_execution_result(batch: &BatchResult, writer: &mut impl Write) -> io::Result<()> {
    writeln!(writer)?;

    if batch.is_empty() {
        writeln!(writer, "No videos to organize.")?;
        return Ok(());
    }

    for result in &batch.results {
        display_item(result, writer)?;
    }

    writeln!(writer)?;
    writeln!(
        writer,
        "Organized {} videos, {} failed.",
        batch.succeeded(),
        batch.failed()
    )?;

    Ok(())
}

fn display_item(result: &ProcessingResult, writer: &mut impl Write) -> io::Result<()> {
    if result.success {
        let path = result
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        writeln!(writer, "  OK    {}\t{}", result.code, path)
    } else {
        let error = result.error.as_deref().unwrap_or("unknown error");
        writeln!(writer, "  FAIL  {}\t{}", result.code, error)
    }
}

/// Display the batch as pretty-printed JSON for scripting
pub fn display_json(batch: &BatchResult, writer: &mut impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, batch)?;
    writeln!(writer)
}
