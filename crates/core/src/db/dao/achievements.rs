use std::sync::Arc;

use rusqlite::params;

use crate::db::Database;
use crate::error::Result;
use crate::models::Achievement;

#[derive(Clone)]
pub struct AchievementsDao {
    db: Arc<Database>,
}

impl AchievementsDao {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Overwrite a game's achievement detail with the source's latest.
    /// Delete-then-insert inside one transaction; called by the recorder's
    /// enrichment step for games played that day.
    pub fn replace_for_game(&self, game_id: i64, achievements: &[Achievement]) -> Result<()> {
        self.db.transaction(|tx| {
            tx.execute(
                "DELETE FROM achievements WHERE game_id = ?1",
                params![game_id],
            )?;

            let mut stmt = tx.prepare(
                "INSERT INTO achievements
                     (game_id, title, description, date, unlocked, icon_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for achievement in achievements {
                stmt.execute(params![
                    game_id,
                    &achievement.title,
                    &achievement.description,
                    &achievement.date,
                    achievement.unlocked as i64,
                    &achievement.icon_url,
                ])?;
            }

            Ok(())
        })
    }

    pub fn for_game(&self, game_id: i64) -> Result<Vec<Achievement>> {
        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, game_id, title, description, date, unlocked, icon_url
                 FROM achievements
                 WHERE game_id = ?1
                 ORDER BY date DESC, id DESC",
            )?;

            let achievements = stmt
                .query_map(params![game_id], |row| {
                    Ok(Achievement {
                        id: row.get(0)?,
                        game_id: row.get(1)?,
                        title: row.get(2)?,
                        description: row.get(3)?,
                        date: row.get(4)?,
                        unlocked: row.get::<_, i64>(5)? != 0,
                        icon_url: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(achievements)
        })
    }
}
