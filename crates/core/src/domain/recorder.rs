use std::sync::Arc;

use chrono::{Duration, FixedOffset, NaiveDate, Utc};
use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::config::TrackerConfig;
use crate::db::{AchievementsDao, Database, GamesDao, RunLogDao, SnapshotsDao};
use crate::error::Error;
use crate::models::{
    Achievement, DailyAggregateSnapshot, DailyGameSnapshot, Game, RecordResult, RunStatus,
};
use crate::source::PlaytimeSource;
use crate::utils::time;

/// Runs one reconciliation cycle: refresh cumulative hours from the
/// source, write the day's snapshot rows atomically, then refresh
/// achievement detail for games played that day.
///
/// At most one cycle runs at a time per recorder; a second trigger
/// observes the guard held and returns `RunStatus::Skipped` without
/// touching the database.
pub struct SnapshotRecorder {
    games: GamesDao,
    achievements: AchievementsDao,
    snapshots: SnapshotsDao,
    run_log: RunLogDao,
    source: Arc<dyn PlaytimeSource>,
    reference_offset: FixedOffset,
    played_epsilon_hours: f64,
    run_guard: Mutex<()>,
}

impl SnapshotRecorder {
    pub fn new(
        db: Arc<Database>,
        source: Arc<dyn PlaytimeSource>,
        config: &TrackerConfig,
    ) -> Self {
        Self {
            games: GamesDao::new(Arc::clone(&db)),
            achievements: AchievementsDao::new(Arc::clone(&db)),
            snapshots: SnapshotsDao::new(Arc::clone(&db)),
            run_log: RunLogDao::new(db),
            source,
            reference_offset: config.reference_offset(),
            played_epsilon_hours: config.played_epsilon_hours,
            run_guard: Mutex::new(()),
        }
    }

    /// Record a snapshot for "today" in the reference timezone.
    pub fn record_today(&self) -> RecordResult {
        self.record_daily_snapshot(time::reference_today(self.reference_offset))
    }

    /// Run one full reconciliation cycle for `target_date`.
    ///
    /// Source failures are non-fatal: the snapshot is taken from stored
    /// hours and the cycle still completes. Only a failure of the core
    /// snapshot write yields `RunStatus::Failed`. Never panics, never
    /// crashes the caller.
    pub fn record_daily_snapshot(&self, target_date: NaiveDate) -> RecordResult {
        let Some(_guard) = self.run_guard.try_lock() else {
            info!(date = %target_date, "reconciliation cycle already running, skipping");
            return RecordResult::skipped(target_date);
        };

        let source_refreshed = self.refresh_hours_from_source();

        let games = match self.games.all() {
            Ok(games) => games,
            Err(e) => return self.fail_cycle(target_date, e),
        };

        let total_hours: f64 = games.iter().filter_map(|g| g.hours_played).sum();
        let games_count = games
            .iter()
            .filter(|g| g.hours_played.is_some_and(|h| h > 0.0))
            .count() as i64;

        let aggregate = DailyAggregateSnapshot {
            date: target_date,
            total_hours,
            games_played: games_count,
        };
        let rows: Vec<DailyGameSnapshot> = games
            .iter()
            .filter_map(|game| {
                let hours = game.hours_played.filter(|h| *h > 0.0)?;
                Some(DailyGameSnapshot {
                    date: target_date,
                    game_id: game.id,
                    game_title: game.title.clone(),
                    hours_played: hours,
                    cover_url: game.cover_url.clone(),
                })
            })
            .collect();

        if let Err(e) = self.snapshots.record(&aggregate, &rows) {
            return self.fail_cycle(target_date, e);
        }

        self.refresh_achievements_for_played(&games, target_date, &rows);

        if let Err(e) = self.run_log.append(
            Utc::now().naive_utc(),
            target_date,
            true,
            Some(total_hours),
            Some(games_count),
            None,
        ) {
            error!(date = %target_date, error = %e, "failed to append run log entry");
        }

        info!(
            date = %target_date,
            total_hours,
            games_count,
            source_refreshed,
            "daily snapshot recorded"
        );

        RecordResult {
            status: RunStatus::Completed,
            date: target_date,
            total_hours,
            games_count,
            source_refreshed,
            error: None,
        }
    }

    /// Best-effort refresh of cumulative hours: one batched source call
    /// for the whole library. Returns whether the refresh succeeded; a
    /// stale snapshot is preferable to no snapshot.
    fn refresh_hours_from_source(&self) -> bool {
        let playtime = match self.source.fetch_library_playtime() {
            Ok(playtime) => playtime,
            Err(e) => {
                warn!(error = %e, retryable = e.is_retryable(), "playtime refresh failed, recording with stored hours");
                return false;
            }
        };

        let tracked = match self.games.tracked() {
            Ok(tracked) => tracked,
            Err(e) => {
                warn!(error = %e, "could not load tracked games for refresh");
                return false;
            }
        };

        let mut updated = 0usize;
        for game in &tracked {
            let Some(app_id) = game.steam_app_id else {
                continue;
            };
            let Some(&minutes) = playtime.get(&app_id) else {
                continue;
            };
            // Zero minutes means the source has no playtime on record;
            // keep whatever is stored rather than clobbering it.
            if minutes == 0 {
                continue;
            }

            let hours = round_hours(f64::from(minutes) / 60.0);
            if game.hours_played == Some(hours) {
                continue;
            }
            match self.games.update_hours(game.id, hours) {
                Ok(()) => updated += 1,
                Err(e) => {
                    warn!(game_id = game.id, error = %e, "failed to store refreshed hours");
                }
            }
        }

        info!(tracked = tracked.len(), updated, "refreshed cumulative hours from source");
        true
    }

    /// For each game whose hours rose above the previous day's snapshot,
    /// re-fetch and overwrite its achievement detail. Per-game failures
    /// are logged and skipped.
    fn refresh_achievements_for_played(
        &self,
        games: &[Game],
        target_date: NaiveDate,
        rows: &[DailyGameSnapshot],
    ) {
        let previous_date = target_date - Duration::days(1);

        let previous_hours: std::collections::HashMap<i64, f64> =
            match self.snapshots.has_snapshot(previous_date) {
                Ok(true) => match self.snapshots.game_rows(previous_date) {
                    Ok(rows) => rows.into_iter().map(|r| (r.game_id, r.hours_played)).collect(),
                    Err(e) => {
                        warn!(error = %e, "could not load previous snapshot, skipping enrichment");
                        return;
                    }
                },
                // First-ever snapshot: no baseline, nothing was "played today".
                Ok(false) => return,
                Err(e) => {
                    warn!(error = %e, "could not check previous snapshot, skipping enrichment");
                    return;
                }
            };

        for row in rows {
            let baseline = previous_hours.get(&row.game_id).copied().unwrap_or(0.0);
            if row.hours_played - baseline <= self.played_epsilon_hours {
                continue;
            }

            let Some(app_id) = games
                .iter()
                .find(|g| g.id == row.game_id)
                .and_then(|g| g.steam_app_id)
            else {
                continue;
            };

            match self.source.fetch_achievements(app_id) {
                Ok(fetched) => {
                    let achievements: Vec<Achievement> = fetched
                        .into_iter()
                        .map(|a| Achievement {
                            id: 0,
                            game_id: row.game_id,
                            title: a.title,
                            description: a.description,
                            date: a.unlock_date,
                            unlocked: a.unlocked,
                            icon_url: a.icon_url,
                        })
                        .collect();

                    if let Err(e) = self.achievements.replace_for_game(row.game_id, &achievements)
                    {
                        warn!(game_id = row.game_id, error = %e, "failed to store achievements");
                    }
                }
                Err(e) => {
                    warn!(game_id = row.game_id, app_id, error = %e, "achievement refresh failed");
                }
            }
        }
    }

    fn fail_cycle(&self, target_date: NaiveDate, error: Error) -> RecordResult {
        error!(date = %target_date, error = %error, "snapshot cycle failed");

        if let Err(log_err) = self.run_log.append(
            Utc::now().naive_utc(),
            target_date,
            false,
            None,
            None,
            Some(&error.to_string()),
        ) {
            error!(date = %target_date, error = %log_err, "failed to append run log entry");
        }

        RecordResult::failed(target_date, error.to_string())
    }
}

fn round_hours(hours: f64) -> f64 {
    (hours * 10.0).round() / 10.0
}
