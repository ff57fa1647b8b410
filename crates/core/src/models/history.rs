use chrono::NaiveDate;

/// One point of the aggregate time series.
///
/// `hours_added` is derived on read by diffing consecutive aggregate
/// snapshots; it is never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyHistoryEntry {
    pub date: NaiveDate,
    pub total_hours: f64,
    pub hours_added: f64,
    pub games_played: i64,
}

/// A game that crossed the played-epsilon threshold on a given day.
#[derive(Debug, Clone, PartialEq)]
pub struct GamePlayed {
    pub game_id: i64,
    pub title: String,
    pub hours_added: f64,
    pub total_hours: f64,
    pub cover_url: Option<String>,
}

/// Per-game breakdown for one date.
///
/// `is_first_day` is set when no snapshot exists for the prior day at
/// all; the absence of a baseline is not evidence of play, so `games`
/// stays empty in that case.
#[derive(Debug, Clone)]
pub struct DailyBreakdown {
    pub date: NaiveDate,
    pub is_first_day: bool,
    pub games: Vec<GamePlayed>,
}
