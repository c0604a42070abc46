//! ClawMiner API
//!
//! REST + SSE surface over axum: the plain HTTP surface the daemon exposes
//! to dashboards and CLIs.

pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::ApiState;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/status", get(routes::health::status))
        .route("/api/mining/status", get(routes::mining::mining_status))
        .route("/api/mining/start", post(routes::mining::mining_start))
        .route("/api/mining/stop", post(routes::mining::mining_stop))
        .route("/api/blocks", get(routes::blocks::list_blocks))
        .route("/api/blocks/count", get(routes::blocks::block_counts))
        .route("/api/blocks/:hash", get(routes::blocks::get_block))
        .route("/api/wallet/import", post(routes::wallet::import_wallet))
        .route("/api/wallet/generate", post(routes::wallet::generate_wallet))
        .route("/api/wallet/export", get(routes::wallet::export_wallet))
        .route("/api/peers", get(routes::peers::list_peers))
        .route("/api/headersync/status", get(routes::headersync::headersync_status))
        .route("/events", get(routes::events::events))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds and serves the router until `shutdown` is cancelled.
pub async fn serve(
    state: ApiState,
    addr: std::net::SocketAddr,
    shutdown: tokio_util::sync::CancellationToken,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "http api listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::{Arc, RwLock};
    use tower::ServiceExt;

    fn test_state() -> (ApiState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = clawminer_store::Store::open(dir.path()).unwrap();
        let events = clawminer_mining::events::new_event_bus();
        let mining = Arc::new(
            clawminer_mining::MiningService::bootstrap(
                clawminer_mining::MiningServiceConfig::default(),
                store.clone(),
                events.clone(),
                "test-addr".into(),
                Arc::new(clawminer_network::NoopReputationSink),
            )
            .unwrap(),
        );
        let identity = clawminer_network::identity::load_or_generate(None).unwrap().0;
        let gossip = Arc::new(
            clawminer_network::GossipNode::spawn(
                identity,
                clawminer_network::GossipConfig::default(),
                Arc::new(NoopHandler),
                Arc::new(clawminer_network::NoopReputationSink),
                tokio_util::sync::CancellationToken::new(),
            )
            .unwrap(),
        );
        let header_sync = Arc::new(clawminer_headersync::HeaderSyncService::new(
            clawminer_headersync::HeaderSyncConfig::default(),
            store.clone(),
        ));
        let state = ApiState {
            store,
            mining,
            gossip,
            header_sync,
            wallet: Arc::new(RwLock::new(clawminer_wallet::Wallet::generate())),
            events,
            node_id: "test-node".into(),
            started_at: std::time::Instant::now(),
        };
        (state, dir)
    }

    struct NoopHandler;
    impl clawminer_network::InboundHandler for NoopHandler {
        fn handle(&self, _sender_id: &str, _envelope: &clawminer_network::Envelope) {}
    }

    #[tokio::test]
    async fn health_returns_200() {
        let (state, _dir) = test_state();
        let app = router(state);
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn block_not_found_returns_404() {
        let (state, _dir) = test_state();
        let app = router(state);
        let hash = "00".repeat(32);
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/blocks/{hash}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
