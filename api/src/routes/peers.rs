use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::Result;
use crate::state::ApiState;

pub async fn list_peers(State(state): State<ApiState>) -> Result<impl IntoResponse> {
    Ok(Json(state.store.list_peers()?))
}
