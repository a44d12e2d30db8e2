//! Souq Cart - storefront cart and coupon service
//!
//! Backs the shopping cart and coupon box of the storefront.
//!
//! ## Features
//! - Guest carts keyed by a cookie token, user carts keyed by account
//! - Stock-bounded add / update / remove with one line per product
//! - Guest cart merge on login
//! - Coupon validation and redemption

use thiserror::Error;

pub mod config;
pub mod domain;
pub mod http;
pub mod outbound;
pub mod ports;
pub mod services;

pub use config::Config;
pub use domain::aggregates::{
    CartError, CartLine, CartView, Coupon, CouponRejection, DiscountType, MergeOutcome, Product,
};
pub use domain::value_objects::{CartScope, CouponCode, GuestToken, UserId};

// =============================================================================
// Error Types
// =============================================================================

/// Failure talking to the backing store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
