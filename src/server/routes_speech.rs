use crate::server::{bad_request, error_response, AppContext};
use alembic_backends::speech;
use alembic_common::{ConversionRequest, ConvertOptions, Error, FormatToken};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

type ApiError = (StatusCode, Json<Value>);

pub fn speech_routes() -> Router<AppContext> {
    Router::new()
        .route("/speech", post(synthesize))
        .route("/speech/voices", get(voices))
}

#[derive(Deserialize)]
struct SpeechRequest {
    text: String,
    rate: Option<u32>,
    volume: Option<f32>,
    voice: Option<String>,
}

/// Synthesize speech from text as a regular conversion job (txt -> wav).
async fn synthesize(
    State(ctx): State<AppContext>,
    Json(payload): Json<SpeechRequest>,
) -> Result<Json<Value>, ApiError> {
    let text = payload.text.trim();
    if text.is_empty() {
        return Err(bad_request("no text provided"));
    }
    if let Some(rate) = payload.rate {
        if !(50..=400).contains(&rate) {
            return Err(bad_request("rate must be between 50 and 400 WPM"));
        }
    }
    if let Some(volume) = payload.volume {
        if !(0.0..=1.0).contains(&volume) {
            return Err(bad_request("volume must be between 0.0 and 1.0"));
        }
    }

    let source = ctx
        .storage
        .store_upload("speech.txt", text.as_bytes())
        .map_err(|e| error_response(&e))?;

    let request = ConversionRequest {
        source,
        original_filename: "speech.txt".to_string(),
        source_format: FormatToken::new("txt"),
        target_format: FormatToken::new("wav"),
        options: ConvertOptions {
            rate: payload.rate,
            volume: payload.volume,
            voice: payload.voice,
            ..Default::default()
        },
    };

    let job_id = ctx
        .scheduler
        .submit(vec![request])
        .map_err(|e| error_response(&e))?;

    Ok(Json(json!({
        "success": true,
        "job_id": job_id,
        "text_length": text.len(),
    })))
}

async fn voices(State(ctx): State<AppContext>) -> Result<Json<Value>, ApiError> {
    match speech::list_voices(&ctx.tools) {
        Ok(voices) => Ok(Json(json!({ "success": true, "voices": voices }))),
        Err(e) => Err(error_response(&Error::tool("espeak-ng", e.to_string()))),
    }
}
