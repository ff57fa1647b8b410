use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::params;

use crate::db::Database;
use crate::error::Result;
use crate::models::RunLogEntry;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Clone)]
pub struct RunLogDao {
    db: Arc<Database>,
}

impl RunLogDao {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn append(
        &self,
        ran_at: NaiveDateTime,
        target_date: NaiveDate,
        success: bool,
        total_hours: Option<f64>,
        games_count: Option<i64>,
        error: Option<&str>,
    ) -> Result<()> {
        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO tracker_run_log
                     (ran_at, target_date, success, total_hours, games_count, error)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    ran_at.format(DATETIME_FORMAT).to_string(),
                    target_date.format(DATE_FORMAT).to_string(),
                    success as i64,
                    total_hours,
                    games_count,
                    error,
                ],
            )?;
            Ok(())
        })
    }

    pub fn recent(&self, limit: u32) -> Result<Vec<RunLogEntry>> {
        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, ran_at, target_date, success, total_hours, games_count, error
                 FROM tracker_run_log
                 ORDER BY id DESC
                 LIMIT ?1",
            )?;

            let entries = stmt
                .query_map(params![limit], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<f64>>(4)?,
                        row.get::<_, Option<i64>>(5)?,
                        row.get::<_, Option<String>>(6)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?
                .into_iter()
                .filter_map(
                    |(id, ran_at, target_date, success, total_hours, games_count, error)| {
                        Some(RunLogEntry {
                            id,
                            ran_at: NaiveDateTime::parse_from_str(&ran_at, DATETIME_FORMAT)
                                .ok()?,
                            target_date: NaiveDate::parse_from_str(&target_date, DATE_FORMAT)
                                .ok()?,
                            success: success != 0,
                            total_hours,
                            games_count,
                            error,
                        })
                    },
                )
                .collect();

            Ok(entries)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_recent() {
        let dao = RunLogDao::new(Arc::new(Database::open_in_memory().unwrap()));

        let ran_at = NaiveDate::from_ymd_opt(2026, 1, 1)
            .and_then(|d| d.and_hms_opt(3, 0, 5))
            .unwrap();
        let target = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();

        dao.append(ran_at, target, true, Some(17.5), Some(2), None)
            .unwrap();
        dao.append(ran_at, target, false, None, None, Some("disk full"))
            .unwrap();

        let entries = dao.recent(10).unwrap();
        assert_eq!(entries.len(), 2);
        // Newest first
        assert!(!entries[0].success);
        assert_eq!(entries[0].error.as_deref(), Some("disk full"));
        assert!(entries[1].success);
        assert_eq!(entries[1].total_hours, Some(17.5));
    }
}
