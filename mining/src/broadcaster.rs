//! Settlement broadcaster: the capability interface that mints tokens for
//! a winning PoI block through an external service. Modeled as a trait
//! rather than runtime type inspection, with three implementations
//! selected at boot from config.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use crate::error::{Error, Result};

const BROADCASTER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize)]
pub struct SettlementRequest {
    pub miner_address: String,
    pub amount: u64,
    pub nonce: u64,
    pub work_commitment: String,
    pub block_hash: String,
}

/// Settles a mined block by broadcasting a minting transaction. Failures
/// are always `NetworkTransient` — they never propagate past structured
/// logging and a retried/abandoned settlement job.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(&self, request: SettlementRequest) -> Result<String>;
}

/// Discards every settlement silently. Used when no broadcaster is
/// configured; mining proceeds exactly as if settlement didn't exist.
pub struct NoopBroadcaster;

#[async_trait]
impl Broadcaster for NoopBroadcaster {
    async fn broadcast(&self, _request: SettlementRequest) -> Result<String> {
        Err(Error::NetworkTransient("no broadcaster configured".into()))
    }
}

/// Broadcasts directly against an in-process chain client. Placeholder
/// for a future native settlement path; currently a thin wrapper that
/// always reports transient failure, since the settlement token economy
/// lives in an external system out of this repo's scope.
pub struct NativeBroadcaster;

#[async_trait]
impl Broadcaster for NativeBroadcaster {
    async fn broadcast(&self, _request: SettlementRequest) -> Result<String> {
        Err(Error::NetworkTransient("native broadcaster not wired".into()))
    }
}

/// Broadcasts via an external HTTP settlement service.
pub struct HttpServiceBroadcaster {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpServiceBroadcaster {
    pub fn new(endpoint: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(BROADCASTER_TIMEOUT)
            .build()
            .expect("reqwest client builds");
        Self { http, endpoint }
    }
}

#[derive(serde::Deserialize)]
struct BroadcastResponse {
    txid: String,
}

#[async_trait]
impl Broadcaster for HttpServiceBroadcaster {
    async fn broadcast(&self, request: SettlementRequest) -> Result<String> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::NetworkTransient(e.to_string()))?;
        let resp = resp
            .error_for_status()
            .map_err(|e| Error::NetworkTransient(e.to_string()))?;
        let body: BroadcastResponse = resp
            .json()
            .await
            .map_err(|e| Error::NetworkTransient(e.to_string()))?;
        Ok(body.txid)
    }
}

/// Settlement job queued by the mining worker and consumed by the
/// dispatcher task pool. Mining is never blocked on external I/O: jobs
/// are enqueued on a bounded `mpsc` channel.
pub struct SettlementJob {
    pub request: SettlementRequest,
}

pub const SETTLEMENT_QUEUE_CAPACITY: usize = 256;
const DISPATCHER_POOL_SIZE: usize = 4;

/// Spawns a small pool of dispatcher tasks draining `rx`, each calling the
/// broadcaster and emitting the result back through `events`. Returns the
/// sender half; enqueue failures (queue full) surface as `Error::Capacity`
/// so callers can log-and-drop per spec's backpressure policy.
pub fn spawn_dispatcher_pool(
    broadcaster: std::sync::Arc<dyn Broadcaster>,
    events: crate::events::EventBus,
) -> tokio::sync::mpsc::Sender<SettlementJob> {
    let (tx, rx) = tokio::sync::mpsc::channel::<SettlementJob>(SETTLEMENT_QUEUE_CAPACITY);
    let rx = std::sync::Arc::new(tokio::sync::Mutex::new(rx));

    for _ in 0..DISPATCHER_POOL_SIZE {
        let broadcaster = broadcaster.clone();
        let events = events.clone();
        let rx = rx.clone();
        tokio::task::spawn(async move {
            loop {
                let job = {
                    let mut guard = rx.lock().await;
                    guard.recv().await
                };
                let Some(job) = job else { return };
                let block_hash_hex = job.request.block_hash.clone();
                match broadcaster.broadcast(job.request).await {
                    Ok(txid) => {
                        if let Ok(hash) = decode_hash(&block_hash_hex) {
                            let _ = events.send(crate::events::Event::MintClaimed {
                                txid,
                                amount: 0,
                                block_hash: hash,
                            });
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "settlement broadcast failed");
                    }
                }
            }
        });
    }

    tx
}

fn decode_hash(s: &str) -> core::result::Result<clawminer_core::Hash, hex::FromHexError> {
    let bytes = hex::decode(s)?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes[..32.min(bytes.len())]);
    Ok(out)
}
