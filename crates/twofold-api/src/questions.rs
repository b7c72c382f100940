use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use twofold_db::models::{PendingRow, QuestionHistory};
use twofold_types::api::{
    CreateQuestionRequest, CreateQuestionResponse, HistoryAnswer, HistoryEntry, PendingQuestion,
};
use twofold_types::models::Partner;

use crate::audio::audio_url;
use crate::error::ApiError;
use crate::{AppState, blocking};

/// GET /api/history — every question with each partner's answer.
pub async fn get_history(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let history = blocking(&state, |db| db.history()).await?;
    let entries: Vec<HistoryEntry> = history.into_iter().map(history_entry).collect();
    Ok(Json(entries))
}

/// GET /api/pending/{user_id} — what the other partner is waiting on.
pub async fn get_pending(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user: Partner = user_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))?;

    let rows = blocking(&state, move |db| db.pending_for(user)).await?;
    let pending: Vec<PendingQuestion> = rows.into_iter().map(pending_question).collect();
    Ok(Json(pending))
}

/// POST /api/questions — add a question to the pool.
pub async fn create_question(
    State(state): State<AppState>,
    Json(req): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = req.text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::BadRequest("Missing question text".into()));
    }
    let category = req
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let now = chrono::Utc::now();
    let id = blocking(&state, move |db| {
        db.add_question(&text, category.as_deref(), now)
    })
    .await?;

    info!("Question {} created", id);
    Ok((StatusCode::CREATED, Json(CreateQuestionResponse { id })))
}

fn history_entry(item: QuestionHistory) -> HistoryEntry {
    let answers = item
        .answers
        .into_iter()
        .map(|a| {
            (
                a.user_id,
                HistoryAnswer {
                    audio_url: audio_url(&a.audio_ref),
                    timestamp: a.timestamp.timestamp_millis(),
                },
            )
        })
        .collect();

    HistoryEntry {
        id: item.question.id,
        text: item.question.text,
        answers,
    }
}

fn pending_question(row: PendingRow) -> PendingQuestion {
    PendingQuestion {
        id: row.question.id,
        text: row.question.text,
        asked_by: row.asked_by,
        timestamp: row.answered_at.timestamp_millis(),
    }
}
