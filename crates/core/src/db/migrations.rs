use rusqlite::Connection;

use crate::{Error, Result};

const SCHEMA_VERSION: i32 = 3;

pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    ensure_migration_table(conn)?;

    let current_version = get_schema_version(conn)?;

    if current_version > SCHEMA_VERSION {
        return Err(Error::Internal(format!(
            "Database schema version ({}) is newer than supported version ({}). Please update the \
             tracker.",
            current_version, SCHEMA_VERSION
        )));
    }

    for version in (current_version + 1)..=SCHEMA_VERSION {
        apply_migration(conn, version).map_err(|e| {
            Error::Internal(format!("Failed to apply migration {}: {}", version, e))
        })?;
    }

    Ok(())
}

fn ensure_migration_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migration (
            id INTEGER PRIMARY KEY
        )",
        [],
    )?;
    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32> {
    let version = conn.query_row("SELECT COALESCE(MAX(id), 0) FROM migration", [], |row| {
        row.get(0)
    })?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("INSERT INTO migration (id) VALUES (?1)", [version])?;
    Ok(())
}

fn apply_migration(conn: &mut Connection, version: i32) -> Result<()> {
    let tx = conn.transaction()?;

    match version {
        1 => migration_v1(&tx)?,
        2 => migration_v2(&tx)?,
        3 => migration_v3(&tx)?,
        _ => {
            return Err(Error::Internal(format!(
                "Unknown migration version: {}",
                version
            )));
        }
    }

    set_schema_version(&tx, version)?;
    tx.commit()?;

    Ok(())
}

/// Registry tables shared with the CRUD front end.
fn migration_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE games(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            platform TEXT,
            status TEXT,
            notes TEXT,
            rating INTEGER,
            hours_played REAL,
            steam_app_id INTEGER,
            cover_url TEXT,
            completion_date TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE achievements(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            game_id INTEGER,
            title TEXT NOT NULL,
            description TEXT,
            date TEXT,
            unlocked INTEGER DEFAULT 1,
            icon_url TEXT,
            FOREIGN KEY(game_id) REFERENCES games(id) ON DELETE CASCADE
        );

        CREATE INDEX games_steam_app_id_idx
            ON games(steam_app_id) WHERE steam_app_id IS NOT NULL;

        CREATE INDEX achievements_game_id_idx
            ON achievements(game_id);
        "#,
    )?;
    Ok(())
}

/// Snapshot tables written only by the recorder.
fn migration_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE daily_snapshots(
            date TEXT PRIMARY KEY,
            total_hours REAL NOT NULL,
            games_played INTEGER NOT NULL
        );

        CREATE TABLE daily_game_snapshots(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            game_id INTEGER NOT NULL,
            game_title TEXT NOT NULL,
            hours_played REAL NOT NULL,
            cover_url TEXT,
            UNIQUE(date, game_id)
        );

        CREATE INDEX daily_game_snapshots_date_idx
            ON daily_game_snapshots(date);
        "#,
    )?;
    Ok(())
}

/// Append-only run log for operational visibility.
fn migration_v3(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE tracker_run_log(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ran_at TEXT NOT NULL,
            target_date TEXT NOT NULL,
            success INTEGER NOT NULL,
            total_hours REAL,
            games_count INTEGER,
            error TEXT
        );
        "#,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::*;

    const EXPECTED_TABLES: &[&str] = &[
        "games",
        "achievements",
        "daily_snapshots",
        "daily_game_snapshots",
        "tracker_run_log",
        "migration",
    ];

    #[test]
    fn test_full_migration_sequence() {
        let mut conn = Connection::open_in_memory().unwrap();

        run_migrations(&mut conn).unwrap();

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(
            version, SCHEMA_VERSION,
            "Schema version should match expected"
        );

        for &table_name in EXPECTED_TABLES {
            assert!(
                table_exists(&conn, table_name),
                "Table '{}' should exist after migrations",
                table_name
            );
        }
    }

    #[test]
    fn test_incremental_migrations() {
        let mut conn = Connection::open_in_memory().unwrap();
        ensure_migration_table(&conn).unwrap();

        for expected_version in 1..=SCHEMA_VERSION {
            apply_migration(&mut conn, expected_version).unwrap();

            let actual_version = get_schema_version(&conn).unwrap();

            assert_eq!(
                actual_version, expected_version,
                "Schema version should be {} after migration {}",
                expected_version, expected_version
            );
        }
    }

    #[test]
    fn test_migration_idempotency() {
        let mut conn = Connection::open_in_memory().unwrap();

        // Run migrations twice
        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION, "Version should remain stable");
    }

    #[test]
    fn test_future_schema_version_error() {
        let conn = Connection::open_in_memory().unwrap();

        conn.execute("CREATE TABLE migration (id INTEGER PRIMARY KEY)", [])
            .unwrap();
        conn.execute(
            "INSERT INTO migration (id) VALUES (?1)",
            [SCHEMA_VERSION + 100],
        )
        .unwrap();

        let mut conn = conn; // Make mutable for migration call
        let result = run_migrations(&mut conn);

        assert!(result.is_err(), "Should error on future schema version");

        let error_msg = result.unwrap_err().to_string();

        assert!(
            error_msg.contains("newer than supported"),
            "Error should mention version incompatibility, got: {}",
            error_msg
        );
    }

    #[test]
    fn test_snapshot_uniqueness_constraints() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();

        conn.execute(
            "INSERT INTO daily_snapshots (date, total_hours, games_played) VALUES ('2026-01-01', 10.0, 2)",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO daily_snapshots (date, total_hours, games_played) VALUES ('2026-01-01', 11.0, 3)",
            [],
        );
        assert!(dup.is_err(), "date must be unique in daily_snapshots");

        conn.execute(
            "INSERT INTO daily_game_snapshots (date, game_id, game_title, hours_played)
             VALUES ('2026-01-01', 7, 'Hades', 12.5)",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO daily_game_snapshots (date, game_id, game_title, hours_played)
             VALUES ('2026-01-01', 7, 'Hades', 13.0)",
            [],
        );
        assert!(dup.is_err(), "(date, game_id) must be unique");
    }

    fn table_exists(conn: &Connection, table_name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master
             WHERE type = 'table' AND name = ?1",
            [table_name],
            |row| row.get(0),
        )
        .unwrap_or(false)
    }
}
