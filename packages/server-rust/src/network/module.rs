//! HTTP module with deferred startup lifecycle.
//!
//! `new()` assembles shared state, `start()` binds the TCP listener, and
//! `serve()` accepts connections until the shutdown future resolves. The
//! split lets the binary wire up the bus bridge (which shares the same
//! shutdown controller) between construction and serving.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    create_article, delete_article, get_article, get_views, health_handler, list_articles,
    liveness_handler, readiness_handler, record_view, update_article, AppState,
};
use super::middleware::apply_http_layers;
use super::shutdown::ShutdownController;
use crate::bus::CorrelationRegistry;
use crate::service::{ArticlesService, ViewsService};

/// Manages the HTTP server lifecycle.
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    state: AppState,
}

impl NetworkModule {
    /// Creates the module without binding any port.
    ///
    /// The shutdown controller is allocated here so the reply listener
    /// and the binary can share it before the server starts.
    #[must_use]
    pub fn new(
        config: NetworkConfig,
        articles: Arc<ArticlesService>,
        views: Arc<ViewsService>,
        registry: Arc<CorrelationRegistry>,
    ) -> Self {
        let state = AppState {
            articles,
            views,
            registry,
            shutdown: Arc::new(ShutdownController::new()),
            start_time: Instant::now(),
        };
        Self {
            config,
            listener: None,
            state,
        }
    }

    /// Shared handle to the shutdown controller.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.state.shutdown)
    }

    /// Assembles the router with every route and the middleware stack.
    ///
    /// Routes:
    /// - `GET /health`, `GET /health/live`, `GET /health/ready`
    /// - `GET|POST /api/articles`
    /// - `GET|PUT|DELETE /api/articles/{id}`
    /// - `GET|POST /api/articles/{id}/views`
    #[must_use]
    pub fn build_router(&self) -> Router {
        let router = Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .route("/api/articles", get(list_articles).post(create_article))
            .route(
                "/api/articles/{id}",
                get(get_article).put(update_article).delete(delete_article),
            )
            .route(
                "/api/articles/{id}/views",
                get(get_views).post(record_view),
            )
            .with_state(self.state.clone());

        apply_http_layers(router, &self.config)
    }

    /// Binds the TCP listener, returning the actual port (useful when the
    /// configured port is 0).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!(host = %self.config.host, port, "HTTP listener bound");
        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves until `shutdown` resolves, then drains in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns an error on a fatal I/O failure.
    ///
    /// # Panics
    ///
    /// Panics if `start()` was not called first.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let router = self.build_router();
        let listener = self
            .listener
            .expect("start() must be called before serve()");
        let shutdown_ctrl = Arc::clone(&self.state.shutdown);

        shutdown_ctrl.set_ready();

        if let Some(tls) = self.config.tls {
            serve_tls(listener, router, &tls, shutdown_ctrl, shutdown).await
        } else {
            serve_plain(listener, router, shutdown_ctrl, shutdown).await
        }
    }
}

/// Plain HTTP serving via axum's built-in server.
async fn serve_plain(
    listener: TcpListener,
    router: Router,
    shutdown_ctrl: Arc<ShutdownController>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!("serving plain HTTP");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    drain(&shutdown_ctrl).await;
    Ok(())
}

/// TLS serving via `axum-server` with rustls, reusing the bound listener.
async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls: &super::config::TlsConfig,
    shutdown_ctrl: Arc<ShutdownController>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let rustls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load TLS certificates: {e}"))?;

    let addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();

    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        shutdown.await;
        shutdown_handle.graceful_shutdown(None);
    });

    info!(%addr, "serving TLS");
    axum_server::from_tcp_rustls(std_listener, rustls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;

    drain(&shutdown_ctrl).await;
    Ok(())
}

/// Flips to draining and waits up to 30 seconds for in-flight requests.
async fn drain(shutdown_ctrl: &ShutdownController) {
    shutdown_ctrl.trigger_shutdown();
    if shutdown_ctrl
        .wait_for_drain(std::time::Duration::from_secs(30))
        .await
    {
        info!("all requests drained");
    } else {
        warn!("drain timeout expired with requests still in flight");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::super::handlers::testing::{test_state, StaticRemote};
    use super::*;

    fn test_module() -> NetworkModule {
        let (state, _store) = test_state(StaticRemote::default());
        NetworkModule {
            config: NetworkConfig {
                port: 0,
                ..NetworkConfig::default()
            },
            listener: None,
            state,
        }
    }

    #[test]
    fn new_does_not_bind() {
        let module = test_module();
        assert!(module.listener.is_none());
    }

    #[tokio::test]
    async fn start_binds_an_ephemeral_port() {
        let mut module = test_module();
        let port = module.start().await.expect("bind should succeed");
        assert!(port > 0);
        assert!(module.listener.is_some());
    }

    #[tokio::test]
    #[should_panic(expected = "start() must be called before serve()")]
    async fn serve_panics_without_start() {
        let module = test_module();
        let _ = module.serve(std::future::pending::<()>()).await;
    }

    #[tokio::test]
    async fn router_serves_liveness() {
        let module = test_module();
        let response = module
            .build_router()
            .oneshot(Request::get("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn router_serves_an_empty_article_page() {
        let module = test_module();
        let response = module
            .build_router()
            .oneshot(
                Request::get("/api/articles?skip=0&take=10")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let page: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(page["total"], 0);
        assert_eq!(page["items"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn router_returns_404_for_unknown_article() {
        let module = test_module();
        let response = module
            .build_router()
            .oneshot(
                Request::get(format!("/api/articles/{}", uuid::Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
