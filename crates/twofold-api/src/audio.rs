use std::io;
use std::path::PathBuf;

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

/// Formats browsers record to, plus the common desktop ones.
pub const ALLOWED_EXTENSIONS: &[&str] = &["webm", "mp3", "ogg", "wav", "m4a"];

/// 25 MB per recording
pub const MAX_AUDIO_SIZE: usize = 25 * 1024 * 1024;

/// Where answer recordings live on disk.
///
/// Each recording is one flat file named `{uuid}.{ext}`; the store only keeps
/// that name.
pub struct AudioStorage {
    dir: PathBuf,
}

impl AudioStorage {
    pub async fn new(dir: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Audio storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    /// Write a recording under a fresh name and return that name.
    pub async fn save(&self, extension: &str, bytes: &[u8]) -> io::Result<String> {
        let filename = format!("{}.{}", Uuid::new_v4(), extension);
        fs::write(self.dir.join(&filename), bytes).await?;
        Ok(filename)
    }

    pub async fn read(&self, filename: &str) -> io::Result<Vec<u8>> {
        fs::read(self.dir.join(filename)).await
    }

    /// Remove a recording whose answer was never stored. Logs instead of
    /// failing; the caller is already reporting an error.
    pub async fn discard(&self, filename: &str) {
        match fs::remove_file(self.dir.join(filename)).await {
            Ok(()) => info!("Cleaned up audio file {}", filename),
            Err(e) => warn!("Could not remove audio file {}: {}", filename, e),
        }
    }
}

/// Lowercased extension of an uploaded file name, if it is one we accept.
pub fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Rejects anything that could leave the audio directory.
pub fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains("..")
        && !filename.contains('/')
        && !filename.contains('\\')
}

pub fn content_type(filename: &str) -> &'static str {
    match allowed_extension(filename).as_deref() {
        Some("webm") => "audio/webm",
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("m4a") => "audio/mp4",
        _ => "application/octet-stream",
    }
}

/// URL a client fetches a stored audio reference from. References that
/// are already URLs pass through.
pub fn audio_url(audio_ref: &str) -> String {
    if audio_ref.contains("://") {
        audio_ref.to_string()
    } else {
        format!("/api/audio/{audio_ref}")
    }
}

/// GET /api/audio/{filename} — play a recording inline.
pub async fn serve_audio(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !is_safe_filename(&filename) {
        return Err(ApiError::BadRequest("Invalid filename".into()));
    }

    let bytes = state.audio.read(&filename).await.map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            ApiError::NotFound("Audio file not found".into())
        } else {
            ApiError::Storage(e)
        }
    })?;

    Ok(([(header::CONTENT_TYPE, content_type(&filename))], bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_is_case_insensitive() {
        assert_eq!(allowed_extension("clip.WEBM").as_deref(), Some("webm"));
        assert_eq!(allowed_extension("voice.note.m4a").as_deref(), Some("m4a"));
        assert_eq!(allowed_extension("notes.txt"), None);
        assert_eq!(allowed_extension("noextension"), None);
    }

    #[test]
    fn traversal_names_are_unsafe() {
        assert!(is_safe_filename("4f1c.webm"));
        assert!(!is_safe_filename("../secret"));
        assert!(!is_safe_filename("a/b.ogg"));
        assert!(!is_safe_filename(""));
    }

    #[test]
    fn external_refs_pass_through() {
        assert_eq!(audio_url("audio://a1"), "audio://a1");
        assert_eq!(audio_url("x.ogg"), "/api/audio/x.ogg");
    }

    #[tokio::test]
    async fn save_read_and_discard() {
        let dir = tempfile::tempdir().unwrap();
        let storage = AudioStorage::new(dir.path().join("audio")).await.unwrap();

        let name = storage.save("ogg", b"OggS").await.unwrap();
        assert!(name.ends_with(".ogg"));
        assert_eq!(storage.read(&name).await.unwrap(), b"OggS");

        storage.discard(&name).await;
        assert!(storage.read(&name).await.is_err());
    }
}
