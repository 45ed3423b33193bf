use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use crate::api::{api_error, ApiError};
use crate::models::{SpeakRequest, TranslateRequest, TranslateResponse};
use crate::services::speech::narrate;
use crate::services::translate::translate_text;
use crate::state::AppState;

const MAX_SPEECH_CHARS: usize = 5_000;

/// POST /api/translate
pub async fn translate(
    State(state): State<AppState>,
    Json(req): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, ApiError> {
    let text = translate_text(&*state.translator, &req.text, &req.source, &req.target)
        .await
        .map_err(|e| api_error("Translation failed", e))?;
    Ok(Json(TranslateResponse { text }))
}

/// POST /api/speak - MP3 narration of the given text.
pub async fn speak(
    State(state): State<AppState>,
    Json(req): Json<SpeakRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Text is required".to_string()));
    }
    if text.chars().count() > MAX_SPEECH_CHARS {
        return Err((
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("Text exceeds {MAX_SPEECH_CHARS} characters"),
        ));
    }

    let audio = narrate(&*state.speech, &*state.translator, text)
        .await
        .map_err(|e| api_error("Speech synthesis failed", e))?;

    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio))
}
