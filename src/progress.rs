//! Console rendering of step events.
//!
//! In verbose mode output is suppressed since tracing already logs every
//! transition. In normal mode each event becomes one colored status line.

use crate::tracker::{StepEvent, StepListener, StepStatus};
use chrono::{Local, TimeDelta};
use colored::Colorize;
use std::io::{self, IsTerminal, Write};
use std::sync::Mutex;

/// Step listener printing one line per transition
pub struct Progress {
    writer: Mutex<Box<dyn Write + Send>>,
    /// When true, all output is suppressed (verbose mode uses tracing instead)
    silent: bool,
    colors_enabled: bool,
}

/// Check if we should use colors in output
pub fn should_use_colors() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }
    io::stderr().is_terminal()
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress {
    /// Create a new progress reporter writing to stderr
    pub fn new() -> Self {
        Self::new_with_ui(false, should_use_colors())
    }

    /// When `verbose` is true output is suppressed
    pub fn new_with_ui(verbose: bool, colors_enabled: bool) -> Self {
        Self {
            writer: Mutex::new(Box::new(io::stderr())),
            silent: verbose,
            colors_enabled,
        }
    }

    /// Create a progress reporter with a custom writer (for testing)
    #[cfg(test)]
    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
            silent: false,
            colors_enabled: false,
        }
    }

    fn render(&self, event: &StepEvent) -> String {
        let at = event.start_time + TimeDelta::milliseconds(event.duration_ms.unwrap_or(0) as i64);
        let time = format!("[{}]", at.with_timezone(&Local).format("%H:%M:%S%.3f"));

        let icon = match event.status {
            StepStatus::Processing => "▶",
            StepStatus::Completed => "✓",
            StepStatus::Failed => "✗",
        };
        let took = event
            .duration_ms
            .map(|ms| format!(" (took {} ms)", ms))
            .unwrap_or_default();

        if !self.colors_enabled {
            return format!(
                "{} {} [{}] {}: {}{}",
                time, icon, event.task_id, event.step, event.message, took
            );
        }

        let icon = match event.status {
            StepStatus::Processing => icon.cyan(),
            StepStatus::Completed => icon.green().bold(),
            StepStatus::Failed => icon.red().bold(),
        };
        format!(
            "{} {} {} {}: {}{}",
            time.dimmed(),
            icon,
            format!("[{}]", event.task_id).cyan(),
            event.step.bold(),
            event.message,
            took.dimmed()
        )
    }
}

impl StepListener for Progress {
    fn on_step(&self, event: &StepEvent) {
        if self.silent {
            return;
        }

        let line = self.render(event);
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let _ = writeln!(writer, "{}", line);

        if let Some(error) = &event.error {
            if self.colors_enabled {
                let _ = writeln!(writer, "    {} {}", "error:".red().bold(), error.red());
            } else {
                let _ = writeln!(writer, "    error: {}", error);
            }
        }
        let _ = writer.flush();
    }
}
