//! Row mapping between SQLite columns and the shared domain models.
//!
//! Dates are stored as `YYYY-MM-DD` text, timestamps as epoch milliseconds.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use twofold_types::models::{Answer, CoupleState, Partner, Question, User};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A question together with whatever answers it has so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionHistory {
    pub question: Question,
    pub answers: Vec<Answer>,
}

impl QuestionHistory {
    pub fn latest_answer(&self) -> Option<DateTime<Utc>> {
        self.answers.iter().map(|a| a.timestamp).max()
    }
}

/// A question one partner answered and the other has not yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRow {
    pub question: Question,
    pub asked_by: Partner,
    pub answered_at: DateTime<Utc>,
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn format_opt_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(format_date)
}

pub(crate) fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        NaiveDate::parse_from_str(&s, DATE_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

pub(crate) fn partner_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Partner> {
    let raw: String = row.get(idx)?;
    raw.parse::<Partner>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn millis_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(raw).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, raw))
}

/// Columns: id, points, streak, last_answer_date
pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: partner_column(row, 0)?,
        points: row.get(1)?,
        streak: row.get(2)?,
        last_answer_date: date_column(row, 3)?,
    })
}

/// Columns: id, text, category, created_at
pub(crate) fn question_from_row(row: &Row<'_>) -> rusqlite::Result<Question> {
    Ok(Question {
        id: row.get(0)?,
        text: row.get(1)?,
        category: row.get(2)?,
        created_at: millis_column(row, 3)?,
    })
}

/// Columns: question_id, user_id, audio_ref, timestamp
pub(crate) fn answer_from_row(row: &Row<'_>) -> rusqlite::Result<Answer> {
    Ok(Answer {
        question_id: row.get(0)?,
        user_id: partner_column(row, 1)?,
        audio_ref: row.get(2)?,
        timestamp: millis_column(row, 3)?,
    })
}

/// Columns: love_points, streak_count, last_streak_update_date,
/// daily_progress_date, daily_random_answered, daily_manual_answered
pub(crate) fn couple_state_from_row(row: &Row<'_>) -> rusqlite::Result<CoupleState> {
    Ok(CoupleState {
        love_points: row.get(0)?,
        streak_count: row.get(1)?,
        last_streak_update_date: date_column(row, 2)?,
        daily_progress_date: date_column(row, 3)?,
        daily_random_answered: row.get(4)?,
        daily_manual_answered: row.get(5)?,
    })
}
