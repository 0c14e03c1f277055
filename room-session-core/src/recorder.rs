use std::sync::Mutex;

use crate::domain::GameRecord;

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Recorder unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to store record: {0}")]
    Storage(String),
}

/// Collaborator that persists statistics when a standalone game ends.
///
/// Failures are logged by the caller and never block teardown.
pub trait OutcomeRecorder: Send + Sync {
    fn record(&self, record: &GameRecord) -> Result<(), RecordError>;
}

/// Discards every record
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecorder;

impl OutcomeRecorder for NoopRecorder {
    fn record(&self, _record: &GameRecord) -> Result<(), RecordError> {
        Ok(())
    }
}

/// Keeps records in memory (tests and the CLI summary)
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    records: Mutex<Vec<GameRecord>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<GameRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl OutcomeRecorder for MemoryRecorder {
    fn record(&self, record: &GameRecord) -> Result<(), RecordError> {
        self.records
            .lock()
            .map_err(|e| RecordError::Storage(e.to_string()))?
            .push(record.clone());
        Ok(())
    }
}
