//! Gateway service: wiring, middleware stack, and the HTTP server loop.

use crate::admission::AdmissionGate;
use crate::auth::{AuthSession, RefreshCache, TokenCodec};
use crate::confirm::TxConfirmation;
use crate::domain::config::GatewayConfig;
use crate::domain::error::{codes, ApiError, GatewayError};
use crate::handlers::{self, AppState};
use crate::ingress::TxIngress;
use crate::middleware::{AuthLayer, GatewayMetrics};
use crate::ports::outbound::{AdmissionOracle, ClientTxProcessor, TimeSource};
use axum::extract::DefaultBodyLimit;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use std::any::Any;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// The assembled gateway: auth, admission, ingress, and confirmation behind
/// one HTTP surface.
///
/// All collaborators are injected; the service owns only the refresh cache
/// and the request pipeline.
pub struct GatewayService {
    config: Arc<GatewayConfig>,
    state: AppState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl GatewayService {
    /// Wire up a gateway from configuration and collaborators.
    pub fn new(
        config: GatewayConfig,
        processor: Arc<dyn ClientTxProcessor>,
        oracle: Arc<dyn AdmissionOracle>,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let codec = TokenCodec::from_config(config.auth.secret.as_deref())?;
        let cache = Arc::new(RefreshCache::new());
        let session = Arc::new(AuthSession::new(
            codec,
            cache,
            time,
            &config.auth,
            config.network.default_ecosystem.clone(),
        ));

        let gate = AdmissionGate::new(Arc::clone(&oracle), config.limits.max_tx_size);
        let ingress = Arc::new(TxIngress::new(gate, Arc::clone(&processor)));
        let confirm = Arc::new(TxConfirmation::new(processor));
        let metrics = Arc::new(GatewayMetrics::new());

        let config = Arc::new(config);
        let state = AppState {
            session,
            ingress,
            confirm,
            metrics,
            config: Arc::clone(&config),
        };

        Ok(Self {
            config,
            state,
            shutdown_tx: None,
        })
    }

    /// Build the HTTP router with the full middleware stack.
    ///
    /// The body-size cap is enforced before any parsing; the admission
    /// gate's own ceiling applies to the decoded transaction bytes under it.
    /// Also the seam the integration tests drive: they bind the router to an
    /// ephemeral port instead of calling [`start`](Self::start).
    pub fn router(&self) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(AuthLayer::new(
                Arc::clone(&self.state.session),
                Arc::clone(&self.state.metrics),
            ));

        Router::new()
            .route("/api/v2/getuid", get(handlers::getuid))
            .route("/api/v2/login", post(handlers::login))
            .route("/api/v2/sendTx", post(handlers::send_tx))
            .route("/api/v2/sendSignedTx", post(handlers::send_signed_tx))
            .route("/api/v2/txstatus", post(handlers::txstatus))
            .route("/health", get(handlers::health))
            .layer(DefaultBodyLimit::max(self.config.http.max_request_size))
            .layer(middleware)
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Bind and serve until [`shutdown`](Self::shutdown) fires.
    pub async fn start(&mut self) -> Result<(), GatewayError> {
        let addr = self.config.http_addr();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(e.to_string()))?;
        info!(addr = %addr, "gateway listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("gateway shutting down");
            })
            .await
            .map_err(|e| GatewayError::Internal(e.to_string()))?;

        Ok(())
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Shared metrics handle
    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.state.metrics)
    }
}

/// Convert a handler panic into a generic internal-error response.
///
/// The panic payload is logged with the request outcome; the serving process
/// must never die from a request.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> axum::response::Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    error!(panic = detail, "request handler panicked");

    ApiError::new(codes::INTERNAL, "internal server error").into_response()
}
