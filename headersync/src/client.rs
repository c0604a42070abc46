//! HTTP client for the external Block Headers Service (BHS).

use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;

const HEADER_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteHeader {
    pub height: u64,
    pub hash: String,
    pub version: u32,
    pub merkle_root: String,
    pub timestamp_ms: u64,
    pub bits: u32,
    pub nonce: u64,
    pub prev_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TipResponse {
    height: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct ValidResponse {
    valid: bool,
}

#[derive(Clone)]
pub struct BhsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl BhsClient {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HEADER_FETCH_TIMEOUT)
            .build()
            .expect("reqwest client builds");
        Self { http, base_url, api_key }
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    pub async fn chain_tip_height(&self) -> Result<u64> {
        let url = format!("{}/tip", self.base_url.trim_end_matches('/'));
        let resp = self.authed(self.http.get(&url)).send().await?.error_for_status()?;
        let tip: TipResponse = resp.json().await?;
        Ok(tip.height)
    }

    pub async fn fetch_header(&self, height: u64) -> Result<RemoteHeader> {
        let url = format!("{}/headers/{}", self.base_url.trim_end_matches('/'), height);
        let resp = self.authed(self.http.get(&url)).send().await?.error_for_status()?;
        let header: RemoteHeader = resp.json().await?;
        Ok(header)
    }

    /// Remote fallback for `ValidateMerkleRoot` when the height isn't in
    /// the local headers table yet.
    pub async fn validate_merkle_root(&self, root_hex: &str, height: u64) -> Result<bool> {
        let url = format!(
            "{}/headers/{}/validate?root={}",
            self.base_url.trim_end_matches('/'),
            height,
            root_hex
        );
        let resp = self.authed(self.http.get(&url)).send().await?.error_for_status()?;
        let validity: ValidResponse = resp.json().await?;
        Ok(validity.valid)
    }
}
