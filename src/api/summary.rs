use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::stream::{self, Stream, StreamExt};

use crate::api::{api_error, ApiError};
use crate::error::validate_top_k;
use crate::models::SummaryRequest;
use crate::services::translate::{translate_text, Translator, DEFAULT_LANGUAGE};
use crate::state::AppState;
use crate::summary::{stream_summary, SummaryEvent, SummaryStream};

const MAX_QUERY_LEN: usize = 1000;
const IDLE_TIMEOUT_SECS: u64 = 30;

/// POST /api/summary - retrieve passages and stream a link-annotated summary over SSE.
///
/// Events: `passages` (with the summary's `link_style`), `partial` (after every
/// fragment), `final`, an optional `translation` when the request language is
/// not English, `error`, `done`.
pub async fn summary(
    State(state): State<AppState>,
    Json(req): Json<SummaryRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    // ── Step 1: Validate input ───────────────────────────
    let query = truncate_to_char_boundary(req.query.trim(), MAX_QUERY_LEN);
    if query.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Query is required".to_string()));
    }
    let top_k = validate_top_k(req.top_k).map_err(|e| api_error("Invalid request", e.into()))?;
    let language = normalize_language(&req.language);

    // ── Step 2: Acquire semaphore ────────────────────────
    let permit = state
        .summary_semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Summary service at capacity".to_string(),
            )
        })?;

    // ── Step 3: Bring the query into English ─────────────
    let english_query = translate_text(&*state.translator, &query, &language, DEFAULT_LANGUAGE)
        .await
        .map_err(|e| api_error("Query translation failed", e))?;

    // ── Step 4: Retrieve passages ────────────────────────
    let passages = state
        .retriever
        .retrieve(&english_query, top_k)
        .await
        .map_err(|e| api_error("Search failed", e))?;

    let passages_event = Outgoing::new(
        "passages",
        serde_json::json!({ "passages": passages, "link_style": state.link_style }),
    )
    .into_event();

    // ── Step 5: Start the annotated summary stream ───────
    let summary = stream_summary(
        &*state.chat,
        state.links.clone(),
        state.link_style,
        &english_query,
        &passages,
    )
    .await
    .map_err(|e| api_error("Summary failed", e))?;

    tracing::info!(
        "Streaming summary for {english_query:?} over {} passages",
        passages.len()
    );

    // ── Step 6: Map to SSE events with idle timeout ──────
    let events = summary_events(
        summary,
        state.translator.clone(),
        language,
        Duration::from_secs(IDLE_TIMEOUT_SECS),
    );

    let event_stream = stream::once(async move { Ok(passages_event) })
        .chain(events.map(|out| Ok(out.into_event())))
        .chain(stream::once(async {
            Ok(Outgoing::new("done", serde_json::json!({})).into_event())
        }));

    // Hold the semaphore permit for the lifetime of the stream
    let event_stream = event_stream.map(move |event| {
        let _permit = &permit;
        event
    });

    Ok(Sse::new(event_stream).keep_alive(KeepAlive::default()))
}

/// One SSE message before encoding.
#[derive(Debug, Clone, PartialEq)]
struct Outgoing {
    name: &'static str,
    data: serde_json::Value,
}

impl Outgoing {
    fn new(name: &'static str, data: serde_json::Value) -> Self {
        Self { name, data }
    }

    fn error(message: &str) -> Self {
        tracing::warn!("Summary stream error: {message}");
        Self::new("error", serde_json::json!({ "message": message }))
    }

    fn into_event(self) -> Event {
        let Outgoing { name, data } = self;
        match Event::default().event(name).json_data(data) {
            Ok(event) => event,
            Err(e) => Event::default()
                .event("error")
                .data(format!("Failed to encode {name} event: {e}")),
        }
    }
}

struct EventState {
    summary: SummaryStream,
    translator: Arc<dyn Translator>,
    language: String,
    idle_timeout: Duration,
    pending_translation: Option<String>,
    finished: bool,
}

fn summary_events(
    summary: SummaryStream,
    translator: Arc<dyn Translator>,
    language: String,
    idle_timeout: Duration,
) -> impl Stream<Item = Outgoing> + Send {
    let state = EventState {
        summary,
        translator,
        language,
        idle_timeout,
        pending_translation: None,
        finished: false,
    };

    stream::unfold(state, |mut st| async move {
        if let Some(text) = st.pending_translation.take() {
            st.finished = true;
            let out = match translate_text(&*st.translator, &text, DEFAULT_LANGUAGE, &st.language)
                .await
            {
                Ok(translated) => Outgoing::new(
                    "translation",
                    serde_json::json!({ "content": translated, "language": st.language }),
                ),
                Err(e) => Outgoing::error(&format!("Translation failed: {e}")),
            };
            return Some((out, st));
        }
        if st.finished {
            return None;
        }

        match tokio::time::timeout(st.idle_timeout, st.summary.next()).await {
            Ok(Some(Ok(SummaryEvent::Partial(text)))) => Some((
                Outgoing::new("partial", serde_json::json!({ "content": text })),
                st,
            )),
            Ok(Some(Ok(SummaryEvent::Final(text)))) => {
                if st.language == DEFAULT_LANGUAGE {
                    st.finished = true;
                } else {
                    st.pending_translation = Some(text.clone());
                }
                Some((
                    Outgoing::new("final", serde_json::json!({ "content": text })),
                    st,
                ))
            }
            Ok(Some(Err(e))) => {
                st.finished = true;
                Some((Outgoing::error(&e.to_string()), st))
            }
            Ok(None) => None,
            Err(_) => {
                st.finished = true;
                Some((Outgoing::error("LLM response timed out (idle)"), st))
            }
        }
    })
}

fn normalize_language(language: &str) -> String {
    let language = language.trim().to_ascii_lowercase();
    if language.is_empty() {
        DEFAULT_LANGUAGE.to_string()
    } else {
        language
    }
}

fn truncate_to_char_boundary(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    s.char_indices()
        .take_while(|(i, c)| i + c.len_utf8() <= max_len)
        .map(|(_, c)| c)
        .collect()
}
