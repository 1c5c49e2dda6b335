use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;

/// Resolves once SIGINT or SIGTERM (unix) / Ctrl+C (other platforms) is
/// received.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl+c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    println!("{}", "🛑 shutdown signal received".yellow());
}

/// Spawns a task that cancels `token` once [`shutdown_signal`] resolves.
pub fn wire_shutdown(token: CancellationToken) {
    let cancel = token;
    tokio::spawn(async move {
        shutdown_signal().await;
        cancel.cancel();
    });
}
