//! Session tokens: codec, refresh cache, and rotation protocol.

pub mod codec;
pub mod refresh;
pub mod session;

pub use codec::{TokenCodec, BEARER_PREFIX};
pub use refresh::{RefreshCache, RefreshEntry};
pub use session::{AuthSession, IssuedToken, RotatedToken};
