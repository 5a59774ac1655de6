// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{
    config::Config,
    routes,
    store::StoreBackend,
    verify::OracleClient,
    AppState,
};

use anyhow::{Context, Result};
use axum::{
    http::{Method, StatusCode},
    routing::post,
    Router,
};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::info;

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(config: Config) -> Result<Self> {
        // 1. Cache store backend
        let backend = match &config.redis_url {
            Some(url) => StoreBackend::Redis(url.clone()),
            None => StoreBackend::InMemory,
        };
        let store = backend.build().context("Failed to build cache store")?;

        // 2. STI-VS client
        let oracle = OracleClient::new(
            config.sti_vs_url.clone(),
            Duration::from_millis(config.sti_vs_timeout_ms),
        )
        .context("Failed to build STI-VS client")?;
        info!(url = %config.sti_vs_url, timeout_ms = config.sti_vs_timeout_ms, "STI-VS client ready");

        // 3. Shared state + router
        let state = Arc::new(AppState {
            store,
            oracle,
            freshness_sec: config.freshness_sec,
        });
        let router = Self::router(state);

        // 4. Listener
        let addr = format!("{}:{}", config.bind_host, config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Route table, shared with the integration tests.
    ///
    /// The single route carries two ignored 4-character segments around the
    /// destination and origin numbers. Everything else falls through to the
    /// method-aware fallback: POST anywhere else is a miss, any other
    /// method is not allowed.
    pub fn router(state: Arc<AppState>) -> Router {
        Router::new()
            .route(
                "/{lrn}/{dest}/{vln}/{orig}",
                post(routes::verify::verify_batch),
            )
            .fallback(fallback)
            .with_state(state)
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run(self) -> Result<()> {
        info!("📞 SHAKEN verification cache gateway listening on port {}", self.port);
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn fallback(method: Method) -> StatusCode {
    if method == Method::POST {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::METHOD_NOT_ALLOWED
    }
}

// ---------- Graceful shutdown ----------
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
