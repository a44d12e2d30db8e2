//! Application services
pub mod cart;
pub mod coupon;
pub mod identity;

pub use cart::CartService;
pub use coupon::{CouponError, CouponService, ValidCoupon};
pub use identity::{CartIdentity, CartIdentityResolver};
