//! API endpoint integration tests

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use pinky_trust::api::ApiServerBuilder;
use pinky_trust::api::voice::MAX_RECORDING_BYTES;
use pinky_trust::voice::{Language, TranscriptionFailure};
use tower::ServiceExt;

mod common;
use common::{ScriptedSynthesis, pipeline};

/// Router with scripted backends; synthesis fails on any text containing `poison`
fn build_test_router(
    poison: &[&'static str],
    transcript: Result<String, TranscriptionFailure>,
) -> axum::Router {
    ApiServerBuilder::new(0)
        .pipeline(Some(pipeline(ScriptedSynthesis::failing_on(poison), transcript, 15)))
        .default_language(Language::Twi)
        .build()
        .router()
}

fn unconfigured_router() -> axum::Router {
    ApiServerBuilder::new(0).build().router()
}

fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_bytes(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "audio/webm")
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = unconfigured_router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_capabilities_reflect_configuration() {
    let response = build_test_router(&[], Ok(String::new()))
        .oneshot(
            Request::builder()
                .uri("/api/voice/capabilities")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["ttsAvailable"], true);
    assert_eq!(json["sttAvailable"], true);
    assert_eq!(json["translationAvailable"], true);
    assert_eq!(json["defaultLanguage"], "tw");
    assert_eq!(json["maxChunkChars"], 15);
    assert_eq!(json["maxRecordingBytes"], MAX_RECORDING_BYTES);
    assert_eq!(json["languages"].as_array().unwrap().len(), Language::ALL.len());
    assert_eq!(json["languages"][1]["code"], "tw");
    assert_eq!(json["languages"][1]["name"], "Twi");

    let response = unconfigured_router()
        .oneshot(
            Request::builder()
                .uri("/api/voice/capabilities")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = json_body(response).await;
    assert_eq!(json["ttsAvailable"], false);
    assert!(json["maxChunkChars"].is_null());
}

// -- synthesize --------------------------------------------------------------

#[tokio::test]
async fn test_synthesize_returns_base64_chunks() {
    let response = build_test_router(&[], Ok(String::new()))
        .oneshot(post_json(
            "/api/voice/synthesize",
            &serde_json::json!({"text": "Alpha is here. Beta is here.", "language": "gaa"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let chunks: Vec<String> = json["audioChunks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| String::from_utf8(BASE64.decode(c.as_str().unwrap()).unwrap()).unwrap())
        .collect();
    assert_eq!(chunks, vec!["<Alpha is here.>", "<Beta is here.>"]);
    assert_eq!(json["failedChunks"], serde_json::json!([]));
}

#[tokio::test]
async fn test_synthesize_reports_partial_failure() {
    let response = build_test_router(&["Beta"], Ok(String::new()))
        .oneshot(post_json(
            "/api/voice/synthesize",
            &serde_json::json!({"text": "Alpha is here. Beta is here. Gamma is here."}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["audioChunks"].as_array().unwrap().len(), 2);
    assert_eq!(json["failedChunks"][0]["index"], 1);
    assert_eq!(json["failedChunks"][0]["text"], "Beta is here.");
    assert!(json["failedChunks"][0]["error"].as_str().unwrap().contains("500"));
}

#[tokio::test]
async fn test_synthesize_total_failure_is_bad_gateway() {
    let response = build_test_router(&["is"], Ok(String::new()))
        .oneshot(post_json(
            "/api/voice/synthesize",
            &serde_json::json!({"text": "Alpha is here.", "language": "tw"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "synthesis_failed");
}

#[tokio::test]
async fn test_synthesize_rejects_empty_text() {
    let response = build_test_router(&[], Ok(String::new()))
        .oneshot(post_json(
            "/api/voice/synthesize",
            &serde_json::json!({"text": "  ", "language": "tw"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_synthesize_rejects_unknown_language() {
    let response = build_test_router(&[], Ok(String::new()))
        .oneshot(post_json(
            "/api/voice/synthesize",
            &serde_json::json!({"text": "Hello", "language": "klingon"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert!(json["error"]["message"].as_str().unwrap().contains("klingon"));
}

#[tokio::test]
async fn test_synthesize_without_key_is_unavailable() {
    let response = unconfigured_router()
        .oneshot(post_json(
            "/api/voice/synthesize",
            &serde_json::json!({"text": "Hello", "language": "tw"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["error"]["code"], "not_configured");
}

#[tokio::test]
async fn test_synthesize_audio_is_single_payload() {
    let response = build_test_router(&["Beta"], Ok(String::new()))
        .oneshot(post_json(
            "/api/voice/synthesize/audio",
            &serde_json::json!({"text": "Alpha is here. Beta is here. Gamma is here."}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "audio/mpeg");
    assert_eq!(response.headers()["x-failed-chunks"], "1");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"<Alpha is here.><Gamma is here.>");
}

// -- transcribe --------------------------------------------------------------

#[tokio::test]
async fn test_transcribe_returns_text() {
    let response = build_test_router(&[], Ok("\"Me ho yɛ\"".to_string()))
        .oneshot(post_bytes("/api/voice/transcribe?language=tw", vec![7; 2048]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json, serde_json::json!({"status": "text", "text": "Me ho yɛ"}));
}

#[tokio::test]
async fn test_transcribe_no_speech() {
    let response = build_test_router(&[], Ok("\"\"".to_string()))
        .oneshot(post_bytes("/api/voice/transcribe", vec![7; 2048]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, serde_json::json!({"status": "no_speech"}));
}

#[tokio::test]
async fn test_transcribe_rejects_empty_and_tiny_audio() {
    let response = build_test_router(&[], Ok("text".to_string()))
        .oneshot(post_bytes("/api/voice/transcribe?language=tw", Vec::new()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = build_test_router(&[], Ok("text".to_string()))
        .oneshot(post_bytes("/api/voice/transcribe?language=tw", vec![7; 50]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "recording_rejected");
}

#[tokio::test]
async fn test_transcribe_oversized_upload_is_json_413() {
    let response = build_test_router(&[], Ok("Maakye".to_string()))
        .oneshot(post_bytes("/api/voice/transcribe", vec![0; MAX_RECORDING_BYTES + 1]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "payload_too_large");
}

#[tokio::test]
async fn test_transcribe_backend_failure_is_bad_gateway() {
    let failure = TranscriptionFailure::Status {
        status: 500,
        body: "model unavailable".to_string(),
    };
    let response = build_test_router(&[], Err(failure))
        .oneshot(post_bytes("/api/voice/transcribe?language=ee", vec![7; 2048]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "transcription_failed");
    assert!(json["error"]["message"].as_str().unwrap().contains("model unavailable"));
}

// -- translate ---------------------------------------------------------------

#[tokio::test]
async fn test_translate() {
    let response = build_test_router(&[], Ok(String::new()))
        .oneshot(post_json(
            "/api/translate",
            &serde_json::json!({"text": "Good morning", "sourceLang": "en", "targetLang": "tw"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({"translatedText": "[en->tw] Good morning"})
    );
}

#[tokio::test]
async fn test_translate_same_language_is_unchanged() {
    let response = build_test_router(&[], Ok(String::new()))
        .oneshot(post_json(
            "/api/translate",
            &serde_json::json!({"text": "Maakye", "sourceLang": "tw", "targetLang": "TW"}),
        ))
        .await
        .unwrap();

    assert_eq!(
        json_body(response).await,
        serde_json::json!({"translatedText": "Maakye"})
    );
}

#[tokio::test]
async fn test_translate_rejects_empty_text() {
    let response = build_test_router(&[], Ok(String::new()))
        .oneshot(post_json(
            "/api/translate",
            &serde_json::json!({"text": "", "sourceLang": "en", "targetLang": "tw"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// -- server features ---------------------------------------------------------

#[tokio::test]
async fn test_rate_limit_returns_429() {
    let app = ApiServerBuilder::new(0)
        .rate_limit_rpm(Some(1))
        .build()
        .router();

    let request = || {
        Request::builder()
            .uri("/api/voice/capabilities")
            .body(Body::empty())
            .unwrap()
    };

    let first = app.clone().oneshot(request()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.clone().oneshot(request()).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

    // health checks bypass the limiter
    let health = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_static_dir_falls_back_to_index() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>Pinky Trust</h1>").unwrap();
    std::fs::write(dir.path().join("app.js"), "console.log('hi')").unwrap();

    let app = ApiServerBuilder::new(0)
        .static_dir(Some(dir.path().to_path_buf()))
        .build()
        .router();

    let asset = app
        .clone()
        .oneshot(Request::builder().uri("/app.js").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(asset.status(), StatusCode::OK);

    let route = app
        .oneshot(Request::builder().uri("/chat/123").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = axum::body::to_bytes(route.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"<h1>Pinky Trust</h1>");
}
