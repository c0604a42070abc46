use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::error::{ApiError, Result};
use crate::state::ApiState;

#[derive(Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    limit: u64,
    #[serde(default)]
    offset: u64,
}

fn default_limit() -> u64 {
    50
}

pub async fn list_blocks(
    State(state): State<ApiState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse> {
    let blocks = state.store.list_blocks(params.limit, params.offset)?;
    Ok(Json(blocks))
}

pub async fn block_counts(State(state): State<ApiState>) -> Result<impl IntoResponse> {
    Ok(Json(state.store.block_counts()?))
}

pub async fn get_block(
    State(state): State<ApiState>,
    Path(hash_hex): Path<String>,
) -> Result<impl IntoResponse> {
    let bytes = hex::decode(&hash_hex).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let hash: clawminer_core::Hash = bytes
        .try_into()
        .map_err(|_| ApiError::BadRequest("hash must be 32 bytes".into()))?;
    let block = state.store.get_block_by_hash(&hash)?.ok_or(ApiError::NotFound)?;
    Ok(Json(block))
}
