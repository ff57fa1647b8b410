use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};

use crate::config::TrackerConfig;
use crate::db::{Database, SnapshotsDao};
use crate::error::Result;
use crate::models::{DailyBreakdown, DailyHistoryEntry, GamePlayed};
use crate::utils::time;

/// Read side of the snapshot store: chronological aggregate series and
/// per-day game breakdowns, both derived on read by diffing consecutive
/// snapshots. No writes, no locking beyond the store's own.
#[derive(Clone)]
pub struct HistoryService {
    snapshots: SnapshotsDao,
    played_epsilon_hours: f64,
}

impl HistoryService {
    pub fn new(db: Arc<Database>, config: &TrackerConfig) -> Self {
        Self {
            snapshots: SnapshotsDao::new(db),
            played_epsilon_hours: config.played_epsilon_hours,
        }
    }

    /// The most recent `days` recorded dates, ascending. Missing days are
    /// not synthesized; a gap in recording is a gap in the series.
    ///
    /// `hours_added` diffs against the previous recorded snapshot. The
    /// earliest snapshot ever recorded has no baseline and reports 0.
    pub fn get_daily_history(&self, days: u32) -> Result<Vec<DailyHistoryEntry>> {
        if days == 0 {
            return Ok(Vec::new());
        }

        // Fetch one extra row so the window's first entry can still diff
        // against its predecessor.
        let aggregates = self.snapshots.recent_aggregates(days + 1)?;
        let overfetched = aggregates.len() > days as usize;

        let mut previous_total: Option<f64> = None;
        let mut entries: Vec<DailyHistoryEntry> = aggregates
            .into_iter()
            .map(|aggregate| {
                let hours_added = previous_total
                    .map(|prev| aggregate.total_hours - prev)
                    .unwrap_or(0.0);
                previous_total = Some(aggregate.total_hours);
                DailyHistoryEntry {
                    date: aggregate.date,
                    total_hours: aggregate.total_hours,
                    hours_added,
                    games_played: aggregate.games_played,
                }
            })
            .collect();

        if overfetched {
            entries.remove(0);
        }

        Ok(entries)
    }

    /// Which games were played on `date`, judged by diffing that day's
    /// snapshot against the prior day's. Games whose delta stays within
    /// the noise epsilon are excluded; sorted by hours added, descending.
    ///
    /// With no snapshot for `date - 1` at all there is no baseline, so
    /// the result flags `is_first_day` instead of declaring the whole
    /// library "played".
    pub fn get_games_played_on_date(&self, date: NaiveDate) -> Result<DailyBreakdown> {
        let previous_date = date - Duration::days(1);

        if !self.snapshots.has_snapshot(previous_date)? {
            return Ok(DailyBreakdown {
                date,
                is_first_day: true,
                games: Vec::new(),
            });
        }

        let previous_hours: std::collections::HashMap<i64, f64> = self
            .snapshots
            .game_rows(previous_date)?
            .into_iter()
            .map(|row| (row.game_id, row.hours_played))
            .collect();

        let mut games: Vec<GamePlayed> = self
            .snapshots
            .game_rows(date)?
            .into_iter()
            .filter_map(|row| {
                let baseline = previous_hours.get(&row.game_id).copied().unwrap_or(0.0);
                let hours_added = row.hours_played - baseline;
                (hours_added > self.played_epsilon_hours).then(|| GamePlayed {
                    game_id: row.game_id,
                    title: row.game_title,
                    hours_added,
                    total_hours: row.hours_played,
                    cover_url: row.cover_url,
                })
            })
            .collect();

        games.sort_by(|a, b| {
            b.hours_added
                .partial_cmp(&a.hours_added)
                .unwrap_or(Ordering::Equal)
        });

        Ok(DailyBreakdown {
            date,
            is_first_day: false,
            games,
        })
    }

    /// Same as [`get_games_played_on_date`], for a caller-supplied
    /// `YYYY-MM-DD` string.
    ///
    /// [`get_games_played_on_date`]: Self::get_games_played_on_date
    pub fn get_games_played_on(&self, raw_date: &str) -> Result<DailyBreakdown> {
        self.get_games_played_on_date(time::parse_date(raw_date)?)
    }
}
