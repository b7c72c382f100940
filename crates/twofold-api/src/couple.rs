use axum::{Json, extract::State, response::IntoResponse};

use twofold_types::api::StateResponse;

use crate::error::ApiError;
use crate::{AppState, blocking};

/// GET /api/state — points, streak and today's slots.
pub async fn get_state(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let today = twofold_db::today();
    let couple = blocking(&state, move |db| db.today_progress(today)).await?;
    Ok(Json(StateResponse::from(&couple)))
}
