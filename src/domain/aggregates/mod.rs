//! Aggregates module
pub mod cart;
pub mod coupon;
pub mod product;

pub use cart::{CartError, CartLine, CartLineView, CartView, MergeOutcome, MergePlan};
pub use coupon::{Coupon, CouponRejection, DiscountType};
pub use product::Product;
