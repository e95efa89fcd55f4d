//! Bearer-token authentication middleware.
//!
//! Runs on every request: establishes the caller's identity from the
//! `Authorization` header, transparently rotating near-expiry tokens, and
//! injects the resulting [`Identity`] into request extensions. Auth failures
//! are answered here with the structured 401-class body and never reach the
//! handlers.

use crate::auth::session::AuthSession;
use crate::auth::TokenCodec;
use crate::domain::claims::Identity;
use crate::domain::error::ApiError;
use crate::middleware::metrics::GatewayMetrics;
use axum::{body::Body, http::header::AUTHORIZATION, http::Request, response::IntoResponse, response::Response};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::debug;

/// Authentication layer
#[derive(Clone)]
pub struct AuthLayer {
    session: Arc<AuthSession>,
    metrics: Arc<GatewayMetrics>,
}

impl AuthLayer {
    pub fn new(session: Arc<AuthSession>, metrics: Arc<GatewayMetrics>) -> Self {
        Self { session, metrics }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            session: Arc::clone(&self.session),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    session: Arc<AuthSession>,
    metrics: Arc<GatewayMetrics>,
}

impl<S> Service<Request<Body>> for AuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let session = Arc::clone(&self.session);
        let metrics = Arc::clone(&self.metrics);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            metrics.record_request();

            let header = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();

            let identity = if header.is_empty() {
                // No identity is not a failure; the caller acts as an
                // anonymous client of the default ecosystem.
                match session.validate("") {
                    Ok(identity) => identity,
                    Err(e) => {
                        metrics.record_auth_failure();
                        return Ok(ApiError::from(e).into_response());
                    }
                }
            } else {
                match session.rotate(&header) {
                    Ok(rotated) => {
                        let presented = TokenCodec::strip_bearer(&header).ok().flatten();
                        if presented != Some(rotated.token.as_str()) {
                            metrics.record_rotation();
                        }
                        Identity::Authenticated(rotated.claims)
                    }
                    Err(e) => {
                        debug!(error = %e, "rejecting request with invalid token");
                        metrics.record_auth_failure();
                        return Ok(ApiError::from(e).into_response());
                    }
                }
            };

            req.extensions_mut().insert(identity);
            inner.call(req).await
        })
    }
}
