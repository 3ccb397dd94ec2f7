//! Gateway server

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use super::router::{AppState, create_router};
use crate::catalog::{CatalogStore, CatalogWatcher};
use crate::config::Config;
use crate::{Error, Result};

/// Registry gateway server
pub struct Gateway {
    /// Configuration
    config: Config,
    /// Live catalog store
    store: Arc<CatalogStore>,
}

impl Gateway {
    /// Create a new gateway, loading the catalog from the configured data
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the catalog directory cannot be read.
    pub fn new(config: Config) -> Result<Self> {
        let store = Arc::new(CatalogStore::open(&config.catalog.data_dir)?);
        Ok(Self { config, store })
    }

    /// Run the gateway
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);

        // Catalog hot-reload
        let _catalog_watcher: Option<CatalogWatcher> = if self.config.catalog.hot_reload {
            match CatalogWatcher::start(Arc::clone(&self.store), shutdown_tx.subscribe()) {
                Ok(watcher) => {
                    info!("Catalog hot-reload enabled");
                    Some(watcher)
                }
                Err(e) => {
                    warn!(error = %e, "Failed to start catalog watcher, hot-reload disabled");
                    None
                }
            }
        } else {
            None
        };

        let record_count = self.store.snapshot().len();
        let state = Arc::new(AppState {
            store: Arc::clone(&self.store),
            cdn: self.config.cdn.clone(),
        });

        let app = create_router(state);
        let listener = TcpListener::bind(addr).await?;

        info!("============================================================");
        info!("REGISTRY GATEWAY v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(host = %self.config.server.host, port = %self.config.server.port, "Listening");
        info!(records = record_count, dir = %self.config.catalog.data_dir, "Catalog loaded");

        if self.config.cdn.secret.is_empty() {
            warn!("CDN token signing disabled - redirects go out unsigned");
        } else {
            info!(
                algorithm = %self.config.cdn.algorithm,
                ttl_secs = self.config.cdn.token_ttl_secs,
                "CDN token signing enabled"
            );
        }
        info!("============================================================");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(shutdown_tx))
            .await?;

        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}
