//! Test server harness for E2E testing
//!
//! Provides `TestVoiceServer` for spawning real voice session servers in
//! tests.

use crate::fixtures::test_config;
use metrics_exporter_prometheus::PrometheusBuilder;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use vs_service::config::Config;
use vs_service::crypto::IdentitySigner;
use vs_service::observability::metrics::init_metrics_recorder;
use vs_service::routes::{self, AppState};

/// Running voice session server bound to a random local port.
///
/// # Example
/// ```rust,ignore
/// #[sqlx::test(migrations = "../../migrations")]
/// async fn test_health(pool: PgPool) -> Result<(), anyhow::Error> {
///     let server = TestVoiceServer::spawn(pool).await?;
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestVoiceServer {
    addr: SocketAddr,
    pool: PgPool,
    config: Config,
    signer: IdentitySigner,
    _handle: JoinHandle<()>,
}

impl TestVoiceServer {
    /// Spawn with the standard test configuration.
    pub async fn spawn(pool: PgPool) -> Result<Self, anyhow::Error> {
        Self::spawn_with_config(pool, test_config()?).await
    }

    /// Spawn with a caller-supplied configuration.
    pub async fn spawn_with_config(pool: PgPool, config: Config) -> Result<Self, anyhow::Error> {
        let state = Arc::new(AppState::new(pool.clone(), config.clone()));
        let signer = state.signer.clone();

        // Only one global recorder per process; later servers get a
        // standalone one.
        let metrics_handle = init_metrics_recorder()
            .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle());

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            pool,
            config,
            signer,
            _handle: handle,
        })
    }

    /// Base URL, e.g. `http://127.0.0.1:54321`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Signer sharing the server's key, for minting valid identity tokens.
    pub fn signer(&self) -> &IdentitySigner {
        &self.signer
    }

    /// `Cookie` header value carrying a valid identity pair for `uid`.
    pub fn identity_cookie_header(&self, uid: &str) -> Result<String, anyhow::Error> {
        let signature = self.signer.sign(uid)?;
        Ok(format!("dt_uid={uid}; dt_uid_sig={signature}"))
    }
}

impl Drop for TestVoiceServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
