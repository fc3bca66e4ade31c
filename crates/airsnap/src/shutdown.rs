use tracing::{info, warn};

/// Resolves on the first SIGINT or SIGTERM. Listeners are installed on the first poll.
pub async fn shutdown_signal() {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for interrupt: {err}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = interrupt => info!("received interrupt, shutting down"),
        _ = terminate() => info!("received terminate, shutting down"),
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(err) => {
            warn!("failed to listen for terminate: {err}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
