use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::{Encoder, Registry, TextEncoder};

#[derive(Clone)]
struct AppState {
    registry: Registry,
    metrics_path: Arc<str>,
}

pub fn create_router(registry: Registry, metrics_path: &str) -> Router {
    let state = AppState {
        registry,
        metrics_path: Arc::from(metrics_path),
    };

    let mut router = Router::new().route(metrics_path, get(metrics));
    if metrics_path != "/" {
        router = router.route("/", get(index));
    }
    router.with_state(state)
}

async fn metrics(State(state): State<AppState>) -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    match encoder.encode(&state.registry.gather(), &mut buffer) {
        Ok(()) => (
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            buffer,
        )
            .into_response(),
        Err(e) => {
            log::error!("Unable to encode metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn index(State(state): State<AppState>) -> String {
    format!(
        "promscript {}\nMetrics are served on {}\n",
        env!("CARGO_PKG_VERSION"),
        state.metrics_path
    )
}

/// Binds `addr` and serves `router` until `shutdown` resolves.
pub async fn serve<F>(addr: SocketAddr, router: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("unable to listen on {addr}"))?;
    log::info!("Serving metrics on http://{addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::exporter::{parse_line, SnapshotPublisher, SnapshotStore};

    async fn get(router: Router, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    fn setup() -> (SnapshotStore, Registry) {
        let store = SnapshotStore::new();
        let registry = Registry::new();
        registry
            .register(Box::new(SnapshotPublisher::new(store.clone()).unwrap()))
            .unwrap();
        (store, registry)
    }

    #[tokio::test]
    async fn serves_current_snapshot() {
        let (store, registry) = setup();
        store.replace(
            ["hostA, cpu, load, 0.75", "hostA, mem, used, 512"]
                .into_iter()
                .map(|l| parse_line(l).unwrap())
                .collect(),
        );

        let (status, content_type, body) = get(create_router(registry, "/metrics"), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/plain"));
        assert!(body.contains("# TYPE prom_custom_exporter gauge"));
        assert!(body.contains("system=\"hostA\"} 0.75"));
        assert!(body.contains("system=\"hostA\"} 512"));
    }

    #[tokio::test]
    async fn serves_empty_body_before_first_cycle() {
        let (_store, registry) = setup();
        let (status, _, body) = get(create_router(registry, "/metrics"), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn custom_path_and_index() {
        let (_store, registry) = setup();
        let router = create_router(registry, "/scrape");

        let (status, _, body) = get(router.clone(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/scrape"));

        let (status, _, _) = get(router, "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
