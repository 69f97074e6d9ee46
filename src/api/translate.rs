//! Translation endpoint

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use super::ApiState;
use super::voice::{VoiceError, configured, resolve_language};
use crate::voice::Progress;

/// Build translation router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/translate", post(translate))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    pub translated_text: String,
}

async fn translate(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, VoiceError> {
    let pipeline = configured(&state)?;
    let source = resolve_language(&state, Some(&request.source_lang))?;
    let target = resolve_language(&state, Some(&request.target_lang))?;

    let translated_text = pipeline
        .translate(&request.text, source, target, &Progress::none())
        .await?;

    Ok(Json(TranslateResponse { translated_text }))
}
