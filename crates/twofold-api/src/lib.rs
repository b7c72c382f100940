pub mod answers;
pub mod audio;
pub mod couple;
pub mod error;
pub mod questions;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tracing::error;

use twofold_db::Database;

use crate::audio::{AudioStorage, MAX_AUDIO_SIZE};
use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub audio: AudioStorage,
}

/// Room for the form fields around the audio part.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/state", get(couple::get_state))
        .route("/api/history", get(questions::get_history))
        .route("/api/pending/{user_id}", get(questions::get_pending))
        .route("/api/questions", post(questions::create_question))
        .route(
            "/api/answer",
            post(answers::post_answer)
                .layer(DefaultBodyLimit::max(MAX_AUDIO_SIZE + MULTIPART_OVERHEAD)),
        )
        .route("/api/audio/{filename}", get(audio::serve_audio))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Run a store call off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> twofold_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
        .map_err(ApiError::from)
}
