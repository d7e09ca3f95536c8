//! Request middleware: sessions, role-gating extractors, rate limiting.

pub mod auth;
pub mod rate_limit;
pub mod session;

pub use auth::{OptionalUser, RequireAdmin, RequireUser, RequireVendor};
pub use session::create_session_layer;
