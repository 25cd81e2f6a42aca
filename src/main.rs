use form_stats::access::ProxyHeaderIdentity;
use form_stats::config::{Backend, ReportConfig};
use form_stats::store::{MySqlStore, SnapshotStore, SubmissionStore};
use form_stats::{router, AppState};
use std::{net::SocketAddr, sync::Arc};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = ReportConfig::from_env()?;
    let store: Arc<dyn SubmissionStore> = match &config.backend {
        Backend::MySql(url) => Arc::new(MySqlStore::connect(url, &config.table_prefix).await?),
        Backend::Snapshot(path) => Arc::new(SnapshotStore::load(path).await?),
    };
    info!(
        backend = store.backend(),
        timezone = config.timezone.name(),
        prefix = %config.table_prefix,
        "report store ready"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(config, store, Arc::new(ProxyHeaderIdentity));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
