use chrono::{NaiveDate, NaiveDateTime};

/// One row per calendar day: the whole library's cumulative state at
/// recording time.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAggregateSnapshot {
    pub date: NaiveDate,
    pub total_hours: f64,
    pub games_played: i64,
}

/// One row per (date, game). Title and cover are denormalized so history
/// survives later deletion or rename of the game.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyGameSnapshot {
    pub date: NaiveDate,
    pub game_id: i64,
    pub game_title: String,
    pub hours_played: f64,
    pub cover_url: Option<String>,
}

/// Append-only record of one recorder invocation.
#[derive(Debug, Clone)]
pub struct RunLogEntry {
    pub id: i64,
    pub ran_at: NaiveDateTime,
    pub target_date: NaiveDate,
    pub success: bool,
    pub total_hours: Option<f64>,
    pub games_count: Option<i64>,
    pub error: Option<String>,
}
