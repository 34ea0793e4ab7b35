//! `voice-session` binary: loads configuration, connects to PostgreSQL and
//! serves the HTTP API until SIGINT or SIGTERM.

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vs_service::config::Config;
use vs_service::observability::metrics::init_metrics_recorder;
use vs_service::routes::{build_routes, AppState};

/// Per-statement limit applied to every pooled connection.
const STATEMENT_TIMEOUT: &str = "5s";

/// How long a request may wait for a pooled connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::from_env().inspect_err(|e| error!("Invalid configuration: {}", e))?;

    info!(
        bind_address = %config.bind_address,
        session_ttl_seconds = config.session_ttl_seconds,
        room_prefix = %config.room_prefix,
        credential_entries = config.credential_map.len(),
        named_credentials = config.named_credentials.len(),
        global_credentials = config.global_credentials.is_some(),
        signing_configured = config.uid_signing_secret.is_some(),
        metadata_api_enabled = config.metadata_api_key.is_some(),
        "Voice session service configured"
    );

    let metrics_handle =
        init_metrics_recorder().inspect_err(|e| error!("Metrics unavailable: {}", e))?;

    let addr: SocketAddr = config
        .bind_address
        .parse()
        .inspect_err(|e| error!("Invalid bind address {}: {}", config.bind_address, e))?;

    let pool = connect_database(&config)
        .await
        .inspect_err(|e| error!("Database unreachable: {}", e))?;
    info!("Database pool ready");

    let app = build_routes(Arc::new(AppState::new(pool, config)), metrics_handle);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Voice session service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    info!("Voice session service stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vs_service=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn connect_database(config: &Config) -> Result<PgPool, sqlx::Error> {
    let options = config
        .database_url
        .parse::<PgConnectOptions>()?
        .options([("statement_timeout", STATEMENT_TIMEOUT)]);

    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .idle_timeout(Duration::from_secs(600))
        .connect_with(options)
        .await
}

/// Resolves on the first of SIGINT or SIGTERM. If a signal handler cannot
/// be installed that branch never resolves.
async fn wait_for_shutdown() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Cannot listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => info!("SIGINT received, draining connections"),
        () = terminate => info!("SIGTERM received, draining connections"),
    }
}
