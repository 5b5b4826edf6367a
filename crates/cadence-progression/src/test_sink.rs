//! Recording and failing notification sinks shared across test modules.

use parking_lot::Mutex;

use cadence_core::errors::CadenceError;
use cadence_core::events::{LevelUp, NotificationSink, TaskCompleted};

/// Sink that records everything delivered to it.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub level_ups: Mutex<Vec<LevelUp>>,
    pub completions: Mutex<Vec<TaskCompleted>>,
}

impl NotificationSink for RecordingSink {
    fn level_up(&self, event: &LevelUp) -> Result<(), CadenceError> {
        self.level_ups.lock().push(event.clone());
        Ok(())
    }

    fn task_completed(&self, event: &TaskCompleted) -> Result<(), CadenceError> {
        self.completions.lock().push(event.clone());
        Ok(())
    }
}

/// Sink whose every delivery fails.
#[derive(Debug, Default)]
pub struct FailingSink;

impl NotificationSink for FailingSink {
    fn level_up(&self, _event: &LevelUp) -> Result<(), CadenceError> {
        Err(CadenceError::External("sink unavailable".to_string()))
    }

    fn task_completed(&self, _event: &TaskCompleted) -> Result<(), CadenceError> {
        Err(CadenceError::External("sink unavailable".to_string()))
    }
}
