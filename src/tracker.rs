//! Per-task, per-step progress tracking.
//!
//! Every pipeline stage is recorded as a [`StepRecord`] keyed by
//! `(task_id, step)`. Each record moves `processing -> completed` or
//! `processing -> failed`, and every transition is published as a
//! [`StepEvent`] to all subscribers. Subscribers are the only way progress is
//! observed outside the organizer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Processing,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Processing => "processing",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, StepStatus::Processing)
    }
}

/// State of one step of one task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub task_id: String,
    pub step: String,
    pub status: StepStatus,
    pub message: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Elapsed milliseconds between start and the terminal transition
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
}

/// Snapshot published on every transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    pub task_id: String,
    pub step: String,
    pub status: StepStatus,
    pub message: String,
    pub error: Option<String>,
    pub start_time: DateTime<Utc>,
    pub duration_ms: Option<u64>,
}

impl From<&StepRecord> for StepEvent {
    fn from(record: &StepRecord) -> Self {
        Self {
            task_id: record.task_id.clone(),
            step: record.step.clone(),
            status: record.status,
            message: record.message.clone(),
            error: record.error.clone(),
            start_time: record.start_time,
            duration_ms: record.duration_ms,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TrackerError {
    #[error("Step '{step}' of task '{task_id}' was never started")]
    NotStarted { task_id: String, step: String },

    #[error("Step '{step}' of task '{task_id}' already finished as {status}")]
    AlreadyFinished {
        task_id: String,
        step: String,
        status: &'static str,
    },
}

/// Receives every step transition
pub trait StepListener: Send {
    fn on_step(&self, event: &StepEvent);
}

struct ChannelListener(Sender<StepEvent>);

impl StepListener for ChannelListener {
    fn on_step(&self, event: &StepEvent) {
        // A dropped receiver just stops listening
        let _ = self.0.send(event.clone());
    }
}

/// Records step state and fans transitions out to listeners
#[derive(Default)]
pub struct StepTracker {
    records: Mutex<HashMap<String, Vec<StepRecord>>>,
    listeners: Mutex<Vec<Box<dyn StepListener>>>,
}

impl std::fmt::Debug for StepTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepTracker")
            .field("tasks", &self.lock_records().len())
            .field("listeners", &self.lock_listeners().len())
            .finish()
    }
}

impl StepTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback listener
    pub fn add_listener(&self, listener: Box<dyn StepListener>) {
        self.lock_listeners().push(listener);
    }

    /// Open a channel that receives every subsequent event
    pub fn subscribe(&self) -> Receiver<StepEvent> {
        let (tx, rx) = mpsc::channel();
        self.add_listener(Box::new(ChannelListener(tx)));
        rx
    }

    /// Begin a step, overwriting any previous record in the same slot
    pub fn start(&self, task_id: &str, step: &str, message: impl Into<String>) -> StepEvent {
        let record = StepRecord {
            task_id: task_id.to_string(),
            step: step.to_string(),
            status: StepStatus::Processing,
            message: message.into(),
            start_time: Utc::now(),
            end_time: None,
            duration_ms: None,
            error: None,
        };

        let event = StepEvent::from(&record);

        {
            let mut records = self.lock_records();
            let steps = records.entry(task_id.to_string()).or_default();
            match steps.iter_mut().find(|r| r.step == step) {
                Some(slot) => *slot = record,
                None => steps.push(record),
            }
        }

        debug!(task_id, step, "Step started");
        self.emit(&event);
        event
    }

    /// Finish a running step successfully, optionally replacing its message
    pub fn complete(
        &self,
        task_id: &str,
        step: &str,
        message: Option<&str>,
    ) -> Result<StepEvent, TrackerError> {
        let event = self.finish(task_id, step, |record| {
            record.status = StepStatus::Completed;
            if let Some(message) = message {
                record.message = message.to_string();
            }
        })?;

        debug!(task_id, step, duration_ms = ?event.duration_ms, "Step completed");
        self.emit(&event);
        Ok(event)
    }

    /// Mark a running step as failed
    pub fn fail(
        &self,
        task_id: &str,
        step: &str,
        error: impl Into<String>,
    ) -> Result<StepEvent, TrackerError> {
        let error = error.into();
        let event = self.finish(task_id, step, |record| {
            record.status = StepStatus::Failed;
            record.error = Some(error.clone());
        })?;

        debug!(task_id, step, error = %error, "Step failed");
        self.emit(&event);
        Ok(event)
    }

    /// Current record for one step
    pub fn record(&self, task_id: &str, step: &str) -> Option<StepRecord> {
        self.lock_records()
            .get(task_id)
            .and_then(|steps| steps.iter().find(|r| r.step == step).cloned())
    }

    /// All records of a task, in the order their steps first started
    pub fn task_steps(&self, task_id: &str) -> Vec<StepRecord> {
        self.lock_records().get(task_id).cloned().unwrap_or_default()
    }

    fn finish<F>(&self, task_id: &str, step: &str, apply: F) -> Result<StepEvent, TrackerError>
    where
        F: FnOnce(&mut StepRecord),
    {
        let mut records = self.lock_records();
        let record = records
            .get_mut(task_id)
            .and_then(|steps| steps.iter_mut().find(|r| r.step == step))
            .ok_or_else(|| {
                warn!(task_id, step, "Terminal transition for a step that was never started");
                TrackerError::NotStarted {
                    task_id: task_id.to_string(),
                    step: step.to_string(),
                }
            })?;

        if record.status.is_terminal() {
            return Err(TrackerError::AlreadyFinished {
                task_id: task_id.to_string(),
                step: step.to_string(),
                status: record.status.as_str(),
            });
        }

        let now = Utc::now();
        apply(record);
        record.end_time = Some(now);
        record.duration_ms = Some(
            now.signed_duration_since(record.start_time)
                .num_milliseconds()
                .max(0) as u64,
        );

        Ok(StepEvent::from(&*record))
    }

    fn emit(&self, event: &StepEvent) {
        for listener in self.lock_listeners().iter() {
            listener.on_step(event);
        }
    }

    fn lock_records(&self) -> MutexGuard<'_, HashMap<String, Vec<StepRecord>>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_listeners(&self) -> MutexGuard<'_, Vec<Box<dyn StepListener>>> {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }
}
