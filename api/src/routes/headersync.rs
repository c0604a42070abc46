use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::state::ApiState;

pub async fn headersync_status(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.header_sync.progress().snapshot())
}
