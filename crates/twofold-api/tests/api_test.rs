// Drives the HTTP surface end to end against an in-memory store and a
// temporary audio directory.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use twofold_api::audio::{AudioStorage, MAX_AUDIO_SIZE};
use twofold_api::{AppStateInner, router};
use twofold_db::Database;

const BOUNDARY: &str = "twofold-test-boundary";

struct Harness {
    app: Router,
    _dir: tempfile::TempDir,
    audio_dir: std::path::PathBuf,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let audio_dir = dir.path().join("audio");
    let state = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        audio: AudioStorage::new(audio_dir.clone()).await.unwrap(),
    });
    Harness {
        app: router(state),
        _dir: dir,
        audio_dir,
    }
}

fn answer_form(user: &str, question: &str, source: &str, filename: &str) -> Body {
    let mut body = String::new();
    for (name, value) in [("userId", user), ("questionText", question), ("source", source)] {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"audioFile\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\nfake-audio-bytes\r\n--{BOUNDARY}--\r\n"
    ));
    Body::from(body)
}

async fn post_answer(app: &Router, body: Body) -> (StatusCode, Value) {
    let request = Request::post("/api/answer")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(body)
        .unwrap();
    send(app, request).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn audio_files(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[tokio::test]
async fn fresh_state_is_zeroed() {
    let h = harness().await;
    let (status, body) = get(&h.app, "/api/state").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lovePoints"], 0);
    assert_eq!(body["streak"], 0);
    assert_eq!(body["dailyRandomAnswered"], false);
    assert_eq!(body["dailyManualAnswered"], false);
}

#[tokio::test]
async fn answers_award_points_and_show_up_everywhere() {
    let h = harness().await;

    let (status, body) = post_answer(
        &h.app,
        answer_form("partner1", "  Favorite memory?  ", "random", "memo.WEBM"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["pointAwarded"], 1);
    assert_eq!(body["lovePoints"], 1);
    assert_eq!(body["streak"], 1);
    assert_eq!(body["dailyRandomAnswered"], true);

    let (_, pending) = get(&h.app, "/api/pending/partner2").await;
    assert_eq!(pending.as_array().unwrap().len(), 1);
    assert_eq!(pending[0]["text"], "Favorite memory?");
    assert_eq!(pending[0]["asked_by"], "partner1");

    let (status, body) = post_answer(
        &h.app,
        answer_form("partner2", "Favorite memory?", "manual", "reply.ogg"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["pointAwarded"], 5);
    assert_eq!(body["lovePoints"], 6);
    assert_eq!(body["dailyManualAnswered"], true);

    let (_, pending) = get(&h.app, "/api/pending/partner2").await;
    assert!(pending.as_array().unwrap().is_empty());

    let (status, history) = get(&h.app, "/api/history").await;
    assert_eq!(status, StatusCode::OK);
    let answers = &history[0]["answers"];
    let url = answers["partner1"]["audioUrl"].as_str().unwrap();
    assert!(url.starts_with("/api/audio/") && url.ends_with(".webm"), "{url}");
    assert!(answers["partner2"]["timestamp"].as_i64().unwrap() > 0);

    let response = h
        .app
        .clone()
        .oneshot(Request::get(url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/webm");
}

#[tokio::test]
async fn duplicate_answer_conflicts_and_cleans_up_audio() {
    let h = harness().await;

    let (status, _) =
        post_answer(&h.app, answer_form("partner1", "Q?", "random", "a.mp3")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(audio_files(&h.audio_dir), 1);

    let (status, body) =
        post_answer(&h.app, answer_form("partner1", "Q?", "manual", "b.mp3")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already answered"));
    assert_eq!(audio_files(&h.audio_dir), 1);

    let (_, state) = get(&h.app, "/api/state").await;
    assert_eq!(state["lovePoints"], 1);
    assert_eq!(state["dailyManualAnswered"], false);
}

#[tokio::test]
async fn invalid_uploads_are_bad_requests() {
    let h = harness().await;

    let cases = [
        answer_form("stranger", "Q?", "random", "a.webm"),
        answer_form("partner1", "   ", "random", "a.webm"),
        answer_form("partner1", "Q?", "sometimes", "a.webm"),
        answer_form("partner1", "Q?", "random", "a.exe"),
    ];
    for body in cases {
        let (status, _) = post_answer(&h.app, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    assert_eq!(audio_files(&h.audio_dir), 0);
}

#[tokio::test]
async fn oversized_upload_is_payload_too_large() {
    let h = harness().await;

    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"userId\"\r\n\r\npartner1\r\n\
         --{BOUNDARY}\r\nContent-Disposition: form-data; name=\"audioFile\"; filename=\"big.webm\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.resize(body.len() + MAX_AUDIO_SIZE + 128 * 1024, b'a');
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let (status, _) = post_answer(&h.app, Body::from(body)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(audio_files(&h.audio_dir), 0);
}

#[tokio::test]
async fn pending_rejects_unknown_user() {
    let h = harness().await;
    let (status, body) = get(&h.app, "/api/pending/stranger").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid user ID");
}

#[tokio::test]
async fn questions_are_unique_by_text() {
    let h = harness().await;
    let create = |text: &str| {
        Request::post("/api/questions")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({ "text": text, "category": "nostalgia" }).to_string(),
            ))
            .unwrap()
    };

    let (status, body) = send(&h.app, create("Favorite memory?")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].as_i64().unwrap() > 0);

    let (status, _) = send(&h.app, create("Favorite memory?")).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn audio_route_guards_the_directory() {
    let h = harness().await;

    let (status, _) = get(&h.app, "/api/audio/missing.webm").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&h.app, "/api/audio/..secret").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
