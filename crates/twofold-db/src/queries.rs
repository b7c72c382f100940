use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::info;
use twofold_types::models::{Answer, Partner, Question, User};

use crate::Database;
use crate::error::{Result, StoreError};
use crate::models::{
    PendingRow, QuestionHistory, answer_from_row, millis_column, question_from_row, user_from_row,
};

impl Database {
    // -- Users --

    pub fn users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, points, streak, last_answer_date FROM Users ORDER BY id")?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn user(&self, id: Partner) -> Result<User> {
        self.with_conn(|conn| query_user(conn, id))
    }

    // -- Questions --

    /// Store a new question. Its text, trimmed, must not match any existing
    /// question.
    pub fn add_question(
        &self,
        text: &str,
        category: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Result<i64> {
        let text = question_text(text)?;
        let id = self.with_tx(|tx| {
            if query_question_by_text(tx, text)?.is_some() {
                return Err(StoreError::UniquenessViolation(format!(
                    "question text already exists: {text:?}"
                )));
            }
            insert_question(tx, text, category, created_at)
        })?;

        info!("Question {} added", id);
        Ok(id)
    }

    /// Id of the question with this (trimmed) text, creating it if needed.
    pub fn find_or_create_question(&self, text: &str, now: DateTime<Utc>) -> Result<i64> {
        self.with_tx(|tx| find_or_create_question(tx, text, now))
    }

    pub fn question(&self, id: i64) -> Result<Option<Question>> {
        self.with_conn(|conn| query_question(conn, id))
    }

    pub fn question_by_text(&self, text: &str) -> Result<Option<Question>> {
        self.with_conn(|conn| query_question_by_text(conn, text.trim()))
    }

    pub fn questions(&self) -> Result<Vec<Question>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, text, category, created_at FROM Questions ORDER BY id DESC",
            )?;
            let rows = stmt
                .query_map([], question_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Answers --

    /// Store one answer. Does not touch points, streaks or daily slots;
    /// `submit_answer` does that as part of the full flow.
    pub fn record_answer(
        &self,
        question_id: i64,
        user_id: &str,
        audio_ref: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        let user: Partner = user_id.parse()?;
        self.with_tx(|tx| insert_answer(tx, question_id, user, audio_ref, timestamp))?;

        info!("Answer recorded for question {} by {}", question_id, user);
        Ok(())
    }

    pub fn answers(&self) -> Result<Vec<Answer>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT question_id, user_id, audio_ref, timestamp FROM Answers
                 ORDER BY timestamp DESC, question_id DESC",
            )?;
            let rows = stmt
                .query_map([], answer_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn answers_for_question(&self, question_id: i64) -> Result<Vec<Answer>> {
        self.with_conn(|conn| query_answers_for_question(conn, question_id))
    }

    // -- Views --

    /// Every question with its answers, most recently answered first.
    /// Unanswered questions come last, newest first.
    pub fn history(&self) -> Result<Vec<QuestionHistory>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, text, category, created_at FROM Questions ORDER BY id DESC",
            )?;
            let questions = stmt
                .query_map([], question_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut history = Vec::with_capacity(questions.len());
            for question in questions {
                let answers = query_answers_for_question(conn, question.id)?;
                history.push(QuestionHistory { question, answers });
            }

            // Stable, so ties keep the newest-question-first order.
            history.sort_by(|a, b| b.latest_answer().cmp(&a.latest_answer()));
            Ok(history)
        })
    }

    /// Questions the other partner answered that `user` has not, most
    /// recently answered first.
    pub fn pending_for(&self, user: Partner) -> Result<Vec<PendingRow>> {
        let other = user.other();
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT q.id, q.text, q.category, q.created_at, a.timestamp
                 FROM Questions q
                 JOIN Answers a ON a.question_id = q.id AND a.user_id = ?1
                 WHERE NOT EXISTS (
                     SELECT 1 FROM Answers mine
                     WHERE mine.question_id = q.id AND mine.user_id = ?2
                 )
                 ORDER BY a.timestamp DESC, q.id DESC",
            )?;
            let rows = stmt
                .query_map([other.as_str(), user.as_str()], |row| {
                    Ok(PendingRow {
                        question: question_from_row(row)?,
                        asked_by: other,
                        answered_at: millis_column(row, 4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

pub(crate) fn query_user(conn: &Connection, id: Partner) -> Result<User> {
    conn.query_row(
        "SELECT id, points, streak, last_answer_date FROM Users WHERE id = ?1",
        [id.as_str()],
        user_from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
}

fn query_question(conn: &Connection, id: i64) -> Result<Option<Question>> {
    let row = conn
        .query_row(
            "SELECT id, text, category, created_at FROM Questions WHERE id = ?1",
            [id],
            question_from_row,
        )
        .optional()?;
    Ok(row)
}

fn query_question_by_text(conn: &Connection, text: &str) -> Result<Option<Question>> {
    let row = conn
        .query_row(
            "SELECT id, text, category, created_at FROM Questions WHERE text = ?1",
            [text],
            question_from_row,
        )
        .optional()?;
    Ok(row)
}

fn query_answers_for_question(conn: &Connection, question_id: i64) -> Result<Vec<Answer>> {
    let mut stmt = conn.prepare(
        "SELECT question_id, user_id, audio_ref, timestamp FROM Answers
         WHERE question_id = ?1 ORDER BY user_id",
    )?;
    let rows = stmt
        .query_map([question_id], answer_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Question text as stored: surrounding whitespace removed, never empty.
fn question_text(text: &str) -> Result<&str> {
    match text.trim() {
        "" => Err(StoreError::InvalidInput("question text is empty".into())),
        trimmed => Ok(trimmed),
    }
}

fn insert_question(
    conn: &Connection,
    text: &str,
    category: Option<&str>,
    created_at: DateTime<Utc>,
) -> Result<i64> {
    let text = question_text(text)?;
    conn.execute(
        "INSERT INTO Questions (text, category, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![text, category, created_at.timestamp_millis()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn find_or_create_question(
    conn: &Connection,
    text: &str,
    now: DateTime<Utc>,
) -> Result<i64> {
    let text = question_text(text)?;
    match query_question_by_text(conn, text)? {
        Some(question) => Ok(question.id),
        None => insert_question(conn, text, None, now),
    }
}

pub(crate) fn answer_exists(conn: &Connection, question_id: i64, user: Partner) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM Answers WHERE question_id = ?1 AND user_id = ?2)",
        rusqlite::params![question_id, user.as_str()],
        |r| r.get(0),
    )?;
    Ok(exists)
}

/// Insert an answer after checking both references and the one-answer
/// rule, so each failure carries a precise message.
pub(crate) fn insert_answer(
    conn: &Connection,
    question_id: i64,
    user: Partner,
    audio_ref: &str,
    timestamp: DateTime<Utc>,
) -> Result<()> {
    if audio_ref.trim().is_empty() {
        return Err(StoreError::InvalidInput("audio reference is empty".into()));
    }
    if query_question(conn, question_id)?.is_none() {
        return Err(StoreError::ConstraintViolation(format!(
            "question {question_id} does not exist"
        )));
    }
    if answer_exists(conn, question_id, user)? {
        return Err(StoreError::ConstraintViolation(format!(
            "{user} already answered question {question_id}"
        )));
    }

    conn.execute(
        "INSERT INTO Answers (question_id, user_id, audio_ref, timestamp) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            question_id,
            user.as_str(),
            audio_ref,
            timestamp.timestamp_millis()
        ],
    )?;
    Ok(())
}
