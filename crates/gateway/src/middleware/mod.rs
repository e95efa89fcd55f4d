//! Middleware stack for the gateway.
//!
//! Layer order: Request → CORS → Trace → CatchPanic → BodyLimit → Auth → Handler

pub mod auth;
pub mod metrics;

pub use auth::AuthLayer;
pub use metrics::GatewayMetrics;
