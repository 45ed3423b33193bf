use axum::extract::State;
use axum::Json;

use crate::api::{api_error, ApiError};
use crate::models::{SearchRequest, SearchResponse};
use crate::state::AppState;

/// POST /api/search - Ranked passages for a query, without a summary.
pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = req.query.trim().to_string();

    let passages = state
        .retriever
        .retrieve(&query, req.top_k)
        .await
        .map_err(|e| api_error("Search failed", e))?;

    Ok(Json(SearchResponse { query, passages }))
}
