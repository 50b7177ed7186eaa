//! Session gateway for the OpsBoard identity stack.
//!
//! Wraps the remote auth API with explicit timeouts and uniform error
//! normalization, and mirrors every successful session into the credential
//! store. Raw provider errors never cross this boundary.

mod error;
mod gateway;

pub use error::{AuthError, AuthErrorKind, AuthResult};
pub use gateway::{GatewayConfig, SessionGateway};
