use std::path::Path;
use std::sync::Arc;

use nodelink::file_io::open_file_for_append;
use nodelink::Error;
use nodelink::Link;
use nodelink::NodeLinkConfig;
use nodelink::NodeTree;
use nodelink::Result;
use nodelink::SnapshotManager;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let settings = NodeLinkConfig::new()?.validate()?;

    // Initializing Logs
    let _guard = init_observability(&settings.link.name, &settings.link.log_dir)?;

    // Restore the node tree before anyone can observe it
    let tree = Arc::new(NodeTree::new());
    let snapshot = if settings.snapshot.enabled {
        let manager = Arc::new(SnapshotManager::new(
            settings.snapshot.path_in(&settings.link.data_dir),
            tree.clone(),
            settings.snapshot.flush_interval(),
        ));
        let source = manager.restore().map_err(|e| {
            error!("snapshot restore failed: {:?}", e);
            Error::Fatal(format!("cannot restore node tree: {e}"))
        })?;
        info!(?source, "node tree restored");
        manager.start()?;
        Some(manager)
    } else {
        None
    };

    let link = Link::new(
        tree.clone(),
        settings.responder.clone(),
        snapshot.as_ref().map(|m| m.dirty_flag()),
    );

    // Initializing Shutdown Signal
    let (graceful_tx, graceful_rx) = watch::channel(());

    let metrics = if settings.monitoring.prometheus_enabled {
        Some(tokio::spawn(nodelink::start_server(
            settings.monitoring.socket_addr(),
            graceful_rx.clone(),
        )))
    } else {
        None
    };

    info!(name = %settings.link.name, "Application started. Waiting for CTRL+C signal...");
    if let Err(e) = graceful_shutdown(graceful_tx).await {
        error!("Failed to shutdown: {:?}", e);
    }

    link.disconnect();
    if let Some(manager) = snapshot {
        manager.stop();
        if let Err(e) = manager.flush() {
            error!("final snapshot flush failed: {:?}", e);
        }
    }
    if let Some(metrics) = metrics {
        let _ = metrics.await;
    }

    println!("Exiting program.");
    Ok(())
}

async fn graceful_shutdown(graceful_tx: watch::Sender<()>) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    info!("Shutdown server..");
    graceful_tx.send(()).map_err(|e| {
        error!("Failed to send shutdown signal: {}", e);
        Error::Fatal(format!("Failed to send shutdown signal: {e}"))
    })?;

    info!("Shutdown completed");
    Ok(())
}

pub fn init_observability(
    name: &str,
    log_dir: &Path,
) -> Result<WorkerGuard> {
    let log_file = open_file_for_append(log_dir.join(name).join("nodelink.log"))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(base_subscriber).init();

    Ok(guard)
}
