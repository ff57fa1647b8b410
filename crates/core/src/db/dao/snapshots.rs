use std::sync::Arc;

use chrono::NaiveDate;
use rusqlite::{OptionalExtension, params};

use crate::db::Database;
use crate::error::Result;
use crate::models::{DailyAggregateSnapshot, DailyGameSnapshot};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone)]
pub struct SnapshotsDao {
    db: Arc<Database>,
}

impl SnapshotsDao {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Write one day's snapshot: upsert the aggregate row and replace the
    /// per-game rows, all inside a single transaction. Re-recording a date
    /// is idempotent; partial writes are impossible.
    pub fn record(
        &self,
        aggregate: &DailyAggregateSnapshot,
        games: &[DailyGameSnapshot],
    ) -> Result<()> {
        let date = aggregate.date.format(DATE_FORMAT).to_string();

        self.db.transaction(|tx| {
            tx.execute(
                "INSERT INTO daily_snapshots (date, total_hours, games_played)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(date) DO UPDATE SET
                     total_hours = ?2,
                     games_played = ?3",
                params![&date, aggregate.total_hours, aggregate.games_played],
            )?;

            tx.execute(
                "DELETE FROM daily_game_snapshots WHERE date = ?1",
                params![&date],
            )?;

            let mut stmt = tx.prepare(
                "INSERT INTO daily_game_snapshots
                     (date, game_id, game_title, hours_played, cover_url)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for game in games {
                stmt.execute(params![
                    &date,
                    game.game_id,
                    &game.game_title,
                    game.hours_played,
                    &game.cover_url,
                ])?;
            }

            Ok(())
        })
    }

    pub fn aggregate(&self, date: NaiveDate) -> Result<Option<DailyAggregateSnapshot>> {
        self.db.with_connection(|conn| {
            let row = conn
                .query_row(
                    "SELECT date, total_hours, games_played
                     FROM daily_snapshots WHERE date = ?1",
                    params![date.format(DATE_FORMAT).to_string()],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, f64>(1)?,
                            row.get::<_, i64>(2)?,
                        ))
                    },
                )
                .optional()?;

            Ok(row.and_then(|(date_str, total_hours, games_played)| {
                let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT).ok()?;
                Some(DailyAggregateSnapshot {
                    date,
                    total_hours,
                    games_played,
                })
            }))
        })
    }

    /// The most recent `limit` aggregate rows, ascending by date. Only
    /// dates that were actually recorded appear; gaps stay gaps.
    pub fn recent_aggregates(&self, limit: u32) -> Result<Vec<DailyAggregateSnapshot>> {
        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT date, total_hours, games_played
                 FROM daily_snapshots
                 ORDER BY date DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt
                .query_map(params![limit], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?
                .into_iter()
                .filter_map(|(date_str, total_hours, games_played)| {
                    let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT).ok()?;
                    Some(DailyAggregateSnapshot {
                        date,
                        total_hours,
                        games_played,
                    })
                })
                .collect::<Vec<_>>();

            rows.reverse();
            Ok(rows)
        })
    }

    pub fn game_rows(&self, date: NaiveDate) -> Result<Vec<DailyGameSnapshot>> {
        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT game_id, game_title, hours_played, cover_url
                 FROM daily_game_snapshots
                 WHERE date = ?1
                 ORDER BY hours_played DESC",
            )?;

            let rows = stmt
                .query_map(params![date.format(DATE_FORMAT).to_string()], |row| {
                    Ok(DailyGameSnapshot {
                        date,
                        game_id: row.get(0)?,
                        game_title: row.get(1)?,
                        hours_played: row.get(2)?,
                        cover_url: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn has_snapshot(&self, date: NaiveDate) -> Result<bool> {
        self.db.with_connection(|conn| {
            let exists = conn.query_row(
                "SELECT COUNT(*) > 0 FROM daily_snapshots WHERE date = ?1",
                params![date.format(DATE_FORMAT).to_string()],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_db() -> Arc<Database> {
        Arc::new(Database::open_in_memory().unwrap())
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn game_row(date: NaiveDate, game_id: i64, title: &str, hours: f64) -> DailyGameSnapshot {
        DailyGameSnapshot {
            date,
            game_id,
            game_title: title.to_string(),
            hours_played: hours,
            cover_url: None,
        }
    }

    #[test]
    fn test_record_and_read_back() {
        let dao = SnapshotsDao::new(setup_test_db());
        let d = date("2026-01-01");

        let aggregate = DailyAggregateSnapshot {
            date: d,
            total_hours: 17.5,
            games_played: 2,
        };
        let rows = vec![
            game_row(d, 1, "Hades", 12.5),
            game_row(d, 2, "Celeste", 5.0),
        ];
        dao.record(&aggregate, &rows).unwrap();

        assert_eq!(dao.aggregate(d).unwrap(), Some(aggregate));
        let stored = dao.game_rows(d).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].game_title, "Hades"); // hours DESC
        assert!(dao.has_snapshot(d).unwrap());
        assert!(!dao.has_snapshot(date("2026-01-02")).unwrap());
    }

    #[test]
    fn test_re_record_is_idempotent() {
        let dao = SnapshotsDao::new(setup_test_db());
        let d = date("2026-01-01");

        let aggregate = DailyAggregateSnapshot {
            date: d,
            total_hours: 17.5,
            games_played: 2,
        };
        let rows = vec![
            game_row(d, 1, "Hades", 12.5),
            game_row(d, 2, "Celeste", 5.0),
        ];

        dao.record(&aggregate, &rows).unwrap();
        dao.record(&aggregate, &rows).unwrap();

        let aggregates = dao.recent_aggregates(10).unwrap();
        assert_eq!(aggregates.len(), 1, "one row per date, never duplicates");
        assert_eq!(dao.game_rows(d).unwrap().len(), 2);
    }

    #[test]
    fn test_re_record_replaces_game_rows() {
        let dao = SnapshotsDao::new(setup_test_db());
        let d = date("2026-01-01");

        dao.record(
            &DailyAggregateSnapshot {
                date: d,
                total_hours: 12.5,
                games_played: 1,
            },
            &[game_row(d, 1, "Hades", 12.5)],
        )
        .unwrap();

        // Second recording drops Hades, adds Celeste
        dao.record(
            &DailyAggregateSnapshot {
                date: d,
                total_hours: 5.0,
                games_played: 1,
            },
            &[game_row(d, 2, "Celeste", 5.0)],
        )
        .unwrap();

        let stored = dao.game_rows(d).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].game_id, 2);
    }

    #[test]
    fn test_recent_aggregates_ascending_and_capped() {
        let dao = SnapshotsDao::new(setup_test_db());

        for day in 1..=9 {
            let d = date(&format!("2026-01-0{day}"));
            dao.record(
                &DailyAggregateSnapshot {
                    date: d,
                    total_hours: day as f64,
                    games_played: 1,
                },
                &[],
            )
            .unwrap();
        }

        let recent = dao.recent_aggregates(7).unwrap();
        assert_eq!(recent.len(), 7);
        assert_eq!(recent[0].date, date("2026-01-03"));
        assert_eq!(recent[6].date, date("2026-01-09"));
        for pair in recent.windows(2) {
            assert!(pair[0].date < pair[1].date, "ascending order");
        }
    }
}
