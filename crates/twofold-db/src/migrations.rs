use chrono::{Days, NaiveDate};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::error::{Result, StoreError};
use crate::models::DATE_FORMAT;

/// Name of the check that keeps `Users.id` inside the fixed pair. SQLite
/// reports it in the failure message.
pub(crate) const KNOWN_PARTNER_CHECK: &str = "known_partner";

/// Ordered schema steps. A step never changes once released; new steps get
/// the next version.
const MIGRATIONS: &[(i64, &str)] = &[(
    1,
    "
    CREATE TABLE IF NOT EXISTS Users (
        id                TEXT PRIMARY KEY
                          CONSTRAINT known_partner CHECK (id IN ('partner1', 'partner2')),
        points            INTEGER NOT NULL DEFAULT 0,
        streak            INTEGER NOT NULL DEFAULT 0,
        last_answer_date  TEXT
    );

    CREATE TABLE IF NOT EXISTS Questions (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        text        TEXT NOT NULL UNIQUE CHECK (length(trim(text)) > 0),
        category    TEXT,
        created_at  INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS Answers (
        question_id  INTEGER NOT NULL REFERENCES Questions(id),
        user_id      TEXT NOT NULL REFERENCES Users(id),
        audio_ref    TEXT NOT NULL,
        timestamp    INTEGER NOT NULL,
        PRIMARY KEY (question_id, user_id)
    );

    CREATE INDEX IF NOT EXISTS idx_answers_user
        ON Answers(user_id, timestamp);

    CREATE TABLE IF NOT EXISTS CoupleState (
        id                       INTEGER PRIMARY KEY CHECK (id = 1),
        love_points              INTEGER NOT NULL DEFAULT 0,
        streak_count             INTEGER NOT NULL DEFAULT 0,
        last_streak_update_date  TEXT,
        daily_progress_date      TEXT,
        daily_random_answered    INTEGER NOT NULL DEFAULT 0 CHECK (daily_random_answered IN (0, 1)),
        daily_manual_answered    INTEGER NOT NULL DEFAULT 0 CHECK (daily_manual_answered IN (0, 1))
    );
    ",
)];

/// Tables `reset` removes. SQLite names are case-insensitive, so this also
/// clears the deprecated lowercase layout.
const TABLES: &[&str] = &["Answers", "Questions", "Users", "CoupleState", "schema_version"];

/// Apply every step newer than the recorded schema version.
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version     INTEGER PRIMARY KEY,
            applied_at  INTEGER NOT NULL
        );",
    )?;

    let current = schema_version(conn)?;

    for &(version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        info!("Running migration v{}", version);
        conn.execute_batch(sql)?;
        conn.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
            (version, chrono::Utc::now().timestamp_millis()),
        )?;
    }

    Ok(())
}

pub fn schema_version(conn: &Connection) -> Result<i64> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;
    Ok(version)
}

/// Insert the two users and the couple state row when they are missing.
///
/// The couple state starts with its last streak update on the day before
/// `today`, so the first points awarded begin a streak of one.
pub fn seed(conn: &Connection, today: NaiveDate) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO Users (id) VALUES ('partner1'), ('partner2')",
        [],
    )?;

    let yesterday = today
        .checked_sub_days(Days::new(1))
        .ok_or_else(|| StoreError::InvalidInput(format!("no day before {today}")))?;

    let inserted = conn.execute(
        "INSERT OR IGNORE INTO CoupleState (id, love_points, streak_count, last_streak_update_date)
         VALUES (1, 0, 0, ?1)",
        [yesterday.format(DATE_FORMAT).to_string()],
    )?;
    if inserted > 0 {
        info!("Seeded couple state");
    }

    Ok(())
}

/// Drop every table and rebuild an empty, seeded store.
pub fn reset(conn: &Connection, force: bool, today: NaiveDate) -> Result<()> {
    let questions = count_if_present(conn, "Questions")?;
    let answers = count_if_present(conn, "Answers")?;

    if questions + answers > 0 {
        if !force {
            return Err(StoreError::ResetRefused { questions, answers });
        }
        warn!(
            "Forcing reset of a populated store ({} questions, {} answers)",
            questions, answers
        );
    }

    for table in TABLES {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))?;
    }

    run(conn)?;
    seed(conn, today)?;

    info!("Store reset");
    Ok(())
}

fn count_if_present(conn: &Connection, table: &str) -> Result<i64> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE)",
        [table],
        |r| r.get(0),
    )?;
    if !exists {
        return Ok(0);
    }
    let count = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
    Ok(count)
}
