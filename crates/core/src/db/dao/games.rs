use std::sync::Arc;

use rusqlite::{OptionalExtension, Row, params};

use crate::db::Database;
use crate::error::Result;
use crate::models::Game;

#[derive(Clone)]
pub struct GamesDao {
    db: Arc<Database>,
}

fn game_from_row(row: &Row<'_>) -> rusqlite::Result<Game> {
    Ok(Game {
        id: row.get(0)?,
        title: row.get(1)?,
        platform: row.get(2)?,
        status: row.get(3)?,
        notes: row.get(4)?,
        rating: row.get(5)?,
        hours_played: row.get(6)?,
        steam_app_id: row.get(7)?,
        cover_url: row.get(8)?,
        completion_date: row.get(9)?,
    })
}

const GAME_COLUMNS: &str = "id, title, platform, status, notes, rating, hours_played, \
                            steam_app_id, cover_url, completion_date";

impl GamesDao {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn get(&self, game_id: i64) -> Result<Option<Game>> {
        self.db.with_connection(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {GAME_COLUMNS} FROM games WHERE id = ?1"))?;

            let game = stmt.query_row(params![game_id], game_from_row).optional()?;

            Ok(game)
        })
    }

    pub fn all(&self) -> Result<Vec<Game>> {
        self.db.with_connection(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {GAME_COLUMNS} FROM games ORDER BY title"))?;

            let games = stmt
                .query_map([], game_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(games)
        })
    }

    /// Games the source adapter can refresh: those linked to a Steam app.
    pub fn tracked(&self) -> Result<Vec<Game>> {
        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {GAME_COLUMNS} FROM games
                 WHERE steam_app_id IS NOT NULL
                 ORDER BY title"
            ))?;

            let games = stmt
                .query_map([], game_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(games)
        })
    }

    pub fn insert(&self, game: &Game) -> Result<i64> {
        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO games
                     (title, platform, status, notes, rating, hours_played,
                      steam_app_id, cover_url, completion_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    &game.title,
                    &game.platform,
                    &game.status,
                    &game.notes,
                    game.rating,
                    game.hours_played,
                    game.steam_app_id,
                    &game.cover_url,
                    &game.completion_date,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Overwrite a game's cumulative hours with the source's latest value.
    pub fn update_hours(&self, game_id: i64, hours: f64) -> Result<()> {
        self.db.with_connection(|conn| {
            conn.execute(
                "UPDATE games SET hours_played = ?2 WHERE id = ?1",
                params![game_id, hours],
            )?;
            Ok(())
        })
    }

    pub fn delete(&self, game_id: i64) -> Result<()> {
        self.db.with_connection(|conn| {
            conn.execute("DELETE FROM games WHERE id = ?1", params![game_id])?;
            Ok(())
        })
    }
}
