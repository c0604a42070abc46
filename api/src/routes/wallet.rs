use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use clawminer_wallet::Wallet;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};
use crate::state::ApiState;

#[derive(Deserialize)]
pub struct ImportRequest {
    wif: String,
}

#[derive(Serialize)]
struct AddressResponse {
    address: String,
}

#[derive(Serialize)]
struct WifResponse {
    wif: String,
}

/// Swaps the active wallet and the mining worker's reward address
/// together so the two never disagree.
pub async fn import_wallet(
    State(state): State<ApiState>,
    Json(req): Json<ImportRequest>,
) -> Result<impl IntoResponse> {
    let wallet = Wallet::load(&req.wif).map_err(ApiError::Wallet)?;
    let address = wallet.address();
    *state.wallet.write().expect("wallet lock poisoned") = wallet;
    state.mining.set_miner_address(address.clone());
    state.store.set_config("wallet_wif", &req.wif)?;
    Ok(Json(AddressResponse { address }))
}

pub async fn generate_wallet(State(state): State<ApiState>) -> Result<impl IntoResponse> {
    let wallet = Wallet::generate();
    let address = wallet.address();
    let wif = wallet.wif();
    *state.wallet.write().expect("wallet lock poisoned") = wallet;
    state.mining.set_miner_address(address.clone());
    state.store.set_config("wallet_wif", &wif)?;
    Ok(Json(AddressResponse { address }))
}

pub async fn export_wallet(State(state): State<ApiState>) -> Result<impl IntoResponse> {
    let wif = state.wallet.read().expect("wallet lock poisoned").wif();
    Ok(Json(WifResponse { wif }))
}
