use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::state::ApiState;

pub async fn mining_status(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.mining.status().await)
}

pub async fn mining_start(State(state): State<ApiState>) -> impl IntoResponse {
    state.mining.set_enabled(true);
    Json(state.mining.status().await)
}

pub async fn mining_stop(State(state): State<ApiState>) -> impl IntoResponse {
    state.mining.set_enabled(false);
    Json(state.mining.status().await)
}
