//! Domain models for the marketplace.
//!
//! Most models derive `sqlx::FromRow` and are fetched directly by the
//! repositories; the user model goes through a row conversion because its
//! email column is parse-validated into [`portobello_core::Email`].

pub mod billing;
pub mod order;
pub mod page;
pub mod review;
pub mod session;
pub mod shipping;
pub mod shop;
pub mod user;

pub use billing::{Coupon, TaxRate};
pub use order::{Order, OrderItem, Payment};
pub use page::{Page, PageQuery, SortDir};
pub use review::Review;
pub use session::{CurrentUser, keys as session_keys};
pub use shipping::ShippingMethod;
pub use shop::{Product, Shop};
pub use user::User;
