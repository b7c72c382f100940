use axum::{
    Json,
    body::Bytes,
    extract::{
        Multipart, State,
        multipart::{Field, MultipartError},
    },
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, info};

use twofold_db::submit::AnswerSubmission;
use twofold_types::api::{AnswerResponse, StateResponse};
use twofold_types::models::{AnswerSource, Partner};

use crate::audio::{MAX_AUDIO_SIZE, allowed_extension};
use crate::error::ApiError;
use crate::{AppState, blocking};

/// Multipart fields of an answer upload, before validation.
#[derive(Default)]
struct AnswerForm {
    user_id: Option<String>,
    question_text: Option<String>,
    source: Option<String>,
    audio: Option<(String, Bytes)>,
}

impl AnswerForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(multipart_error)?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "userId" => form.user_id = Some(text(field).await?),
                "questionText" => form.question_text = Some(text(field).await?),
                "source" => form.source = Some(text(field).await?),
                "audioFile" => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(multipart_error)?;
                    form.audio = Some((filename, bytes));
                }
                other => debug!("Ignoring unexpected form field '{}'", other),
            }
        }

        Ok(form)
    }
}

async fn text(field: Field<'_>) -> Result<String, ApiError> {
    field.text().await.map_err(multipart_error)
}

/// A body cut off by the upload limit is too large, not malformed.
fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(MAX_AUDIO_SIZE)
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// POST /api/answer — store a recorded answer and award its points.
///
/// The recording is written first; if the store then rejects the answer the
/// file is removed again so no orphan recordings pile up.
pub async fn post_answer(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = AnswerForm::read(&mut multipart).await?;

    let user: Partner = form
        .user_id
        .as_deref()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing or invalid userId".into()))?;

    let question_text = form
        .question_text
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing questionText".into()))?
        .to_string();

    let source: AnswerSource = form
        .source
        .as_deref()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing or invalid source".into()))?;

    let (filename, bytes) = form
        .audio
        .ok_or_else(|| ApiError::BadRequest("Missing audioFile".into()))?;
    let extension = allowed_extension(&filename)
        .ok_or_else(|| ApiError::BadRequest("Invalid audio file type".into()))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Empty audioFile".into()));
    }
    if bytes.len() > MAX_AUDIO_SIZE {
        return Err(ApiError::PayloadTooLarge(MAX_AUDIO_SIZE));
    }

    let stored = state.audio.save(&extension, &bytes).await?;
    debug!("Audio saved as {} ({} bytes)", stored, bytes.len());

    let today = twofold_db::today();
    let submission = AnswerSubmission {
        user,
        question_text,
        source,
        audio_ref: stored.clone(),
        timestamp: chrono::Utc::now(),
        today,
    };

    let outcome = match blocking(&state, move |db| db.submit_answer(&submission)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            state.audio.discard(&stored).await;
            return Err(e);
        }
    };

    info!(
        "{} answered question {} (+{})",
        user, outcome.question_id, outcome.points_awarded
    );

    Ok((
        StatusCode::CREATED,
        Json(AnswerResponse {
            message: "Answer saved successfully".into(),
            question_id: outcome.question_id,
            point_awarded: outcome.points_awarded,
            state: StateResponse::from(&outcome.state.as_of(today)),
        }),
    ))
}
