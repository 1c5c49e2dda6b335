use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use owo_colors::OwoColorize;
use std::sync::OnceLock;
use tokio::net::TcpListener;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn install_recorder_once() -> &'static PrometheusHandle {
    PROM_HANDLE.get_or_init(|| {
        PrometheusBuilder::new()
            .install_recorder()
            .expect("install global metrics recorder")
    })
}

/// Starts a `/metrics`, `/healthz`, `/readyz` server on `port` if one isn't
/// already running in this process. Safe to call from every binary at
/// startup; a second call is a no-op.
pub fn spawn_metrics_server(port: u16) {
    let handle = install_recorder_once().clone();
    tokio::spawn(async move {
        let metrics_route = {
            let handle = handle.clone();
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            })
        };
        let app = Router::new()
            .route("/healthz", get(|| async { "ok" }))
            .route("/readyz", get(|| async { "ok" }))
            .route("/metrics", metrics_route);
        let addr = format!("0.0.0.0:{port}");
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                eprintln!("{}{addr}: {e}", "🛑 failed to bind metrics server on ".red());
                return;
            }
        };
        println!("{}{port}", "📈 metrics server listening on :".green());
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("{}{e}", "🛑 metrics server stopped: ".red());
        }
    });
}
