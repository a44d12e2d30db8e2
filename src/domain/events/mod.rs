//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::{GuestToken, UserId};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", rename_all = "snake_case")]
pub enum DomainEvent {
    Cart(CartEvent),
    Coupon(CouponEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartEvent {
    Merged { user_id: UserId, guest_token: GuestToken, migrated_count: usize, merged_count: usize },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CouponEvent {
    Redeemed { coupon_id: Uuid, code: String, user_id: UserId, order_id: Uuid, discount_amount: Decimal },
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Cart(CartEvent::Merged { .. }) => "cart.merged",
            Self::Coupon(CouponEvent::Redeemed { .. }) => "coupon.redeemed",
        }
    }
}
