use chrono::NaiveDate;

/// Outcome of one reconciliation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Snapshot written (possibly from stale hours if the source failed).
    Completed,
    /// Another cycle already held the guard; nothing was written.
    Skipped,
    /// The core snapshot write failed.
    Failed,
}

/// Result returned to both the scheduled path and the manual trigger.
#[derive(Debug, Clone)]
pub struct RecordResult {
    pub status: RunStatus,
    pub date: NaiveDate,
    pub total_hours: f64,
    pub games_count: i64,
    /// Whether the playtime source refresh succeeded this cycle. `false`
    /// means the snapshot was taken from previously stored hours.
    pub source_refreshed: bool,
    pub error: Option<String>,
}

impl RecordResult {
    pub fn skipped(date: NaiveDate) -> Self {
        Self {
            status: RunStatus::Skipped,
            date,
            total_hours: 0.0,
            games_count: 0,
            source_refreshed: false,
            error: None,
        }
    }

    pub fn failed(date: NaiveDate, error: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failed,
            date,
            total_hours: 0.0,
            games_count: 0,
            source_refreshed: false,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, RunStatus::Completed)
    }
}
