use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{CoupleState, Partner};

// -- State --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateResponse {
    pub love_points: i64,
    pub streak: i64,
    pub last_streak_update_date: Option<NaiveDate>,
    pub daily_random_answered: bool,
    pub daily_manual_answered: bool,
}

impl From<&CoupleState> for StateResponse {
    fn from(state: &CoupleState) -> Self {
        Self {
            love_points: state.love_points,
            streak: state.streak_count,
            last_streak_update_date: state.last_streak_update_date,
            daily_random_answered: state.daily_random_answered,
            daily_manual_answered: state.daily_manual_answered,
        }
    }
}

// -- Answers --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub message: String,
    pub question_id: i64,
    pub point_awarded: i64,
    #[serde(flatten)]
    pub state: StateResponse,
}

// -- History --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryAnswer {
    pub audio_url: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub text: String,
    pub answers: BTreeMap<Partner, HistoryAnswer>,
}

// -- Pending --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingQuestion {
    pub id: i64,
    pub text: String,
    pub asked_by: Partner,
    /// When `asked_by` answered, epoch milliseconds.
    pub timestamp: i64,
}

// -- Questions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateQuestionRequest {
    pub text: String,
    pub category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateQuestionResponse {
    pub id: i64,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
