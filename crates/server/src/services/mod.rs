//! Business services.
//!
//! Services compose repositories and external clients (payment gateway,
//! SMTP) behind the route handlers. Pure decision logic lives in standalone
//! functions so it can be unit-tested without a database or network.

pub mod auth;
pub mod checkout;
pub mod email;
pub mod receipts;
pub mod reconcile;
pub mod shipping;
