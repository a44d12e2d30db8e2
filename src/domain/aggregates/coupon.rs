//! Coupon Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::{floor_currency, round_currency};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Percentage => "percentage", Self::Fixed => "fixed" }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for DiscountType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            other => Err(format!("unknown discount type {other:?}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub minimum_amount: Decimal,
    pub maximum_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub for_new_users_only: bool,
}

impl Coupon {
    /// Active and inside `[valid_from, valid_until)`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.valid_from <= now && self.valid_until.map_or(true, |until| now < until)
    }

    pub fn has_uses_left(&self) -> bool {
        self.usage_limit.map_or(true, |limit| self.used_count < limit)
    }

    /// Window, usage limit and minimum order checks, in that order.
    ///
    /// Customer-history checks need store lookups and are run by the caller
    /// only once these pass.
    pub fn check_static(&self, cart_total: Decimal, now: DateTime<Utc>, currency: &str) -> Result<(), CouponRejection> {
        if !self.is_live_at(now) { return Err(CouponRejection::InvalidOrExpired); }
        if !self.has_uses_left() { return Err(CouponRejection::UsageLimitReached); }
        if cart_total < self.minimum_amount {
            return Err(CouponRejection::BelowMinimum {
                minimum: round_currency(self.minimum_amount),
                currency: currency.to_string(),
            });
        }
        Ok(())
    }

    /// Discount for `cart_total`, never more than the total itself.
    ///
    /// Rounding half away from zero can lift a discount clamped to a total
    /// with more than 2 decimals above that total; those are truncated.
    pub fn discount_for(&self, cart_total: Decimal) -> Decimal {
        let cart_total = cart_total.max(Decimal::ZERO);
        let raw = match self.discount_type {
            DiscountType::Percentage => {
                let raw = cart_total * self.discount_value / Decimal::ONE_HUNDRED;
                match self.maximum_discount {
                    Some(max) if raw > max => max,
                    _ => raw,
                }
            }
            DiscountType::Fixed => self.discount_value,
        };
        let discount = round_currency(raw.min(cart_total).max(Decimal::ZERO));
        if discount > cart_total { floor_currency(cart_total) } else { discount }
    }
}

/// Why a coupon was turned down. Checks run in declaration order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CouponRejection {
    #[error("Coupon code is required")]
    CodeRequired,

    #[error("Invalid or expired coupon code")]
    InvalidOrExpired,

    #[error("Coupon usage limit reached")]
    UsageLimitReached,

    #[error("Minimum order amount of {minimum} {currency} required")]
    BelowMinimum { minimum: Decimal, currency: String },

    #[error("This coupon is only for new customers")]
    NotNewCustomer,

    #[error("You have already used this coupon")]
    AlreadyUsed,
}

impl CouponRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::CodeRequired => "code_required",
            Self::InvalidOrExpired => "invalid_or_expired",
            Self::UsageLimitReached => "usage_limit_reached",
            Self::BelowMinimum { .. } => "below_minimum",
            Self::NotNewCustomer => "not_new_customer",
            Self::AlreadyUsed => "already_used",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn coupon(discount_type: DiscountType, value: Decimal) -> Coupon {
        Coupon {
            id: Uuid::new_v4(),
            code: "WELCOME20".into(),
            discount_type,
            discount_value: value,
            minimum_amount: Decimal::ZERO,
            maximum_discount: None,
            usage_limit: None,
            used_count: 0,
            valid_from: Utc::now() - Duration::days(1),
            valid_until: None,
            is_active: true,
            for_new_users_only: false,
        }
    }

    #[test]
    fn test_percentage_clamped_to_maximum() {
        let c = Coupon { maximum_discount: Some(dec!(15.00)), ..coupon(DiscountType::Percentage, dec!(20)) };
        assert_eq!(c.discount_for(dec!(80.00)), dec!(15.00));
        assert_eq!(c.discount_for(dec!(50.00)), dec!(10.00));
    }

    #[rstest]
    #[case(dec!(25), dec!(100.00), dec!(25.00))]
    #[case(dec!(25), dec!(10.00), dec!(10.00))]
    #[case(dec!(5.555), dec!(100.00), dec!(5.56))]
    #[case(dec!(20), dec!(10.005), dec!(10.00))]
    fn test_fixed_discount(#[case] value: Decimal, #[case] total: Decimal, #[case] expected: Decimal) {
        assert_eq!(coupon(DiscountType::Fixed, value).discount_for(total), expected);
    }

    #[test]
    fn test_expired_wins_over_minimum() {
        let now = Utc::now();
        let c = Coupon {
            valid_until: Some(now - Duration::hours(1)),
            minimum_amount: dec!(100),
            ..coupon(DiscountType::Fixed, dec!(5))
        };
        assert_eq!(c.check_static(dec!(10), now, "AED"), Err(CouponRejection::InvalidOrExpired));
    }

    #[rstest]
    #[case::inactive(Coupon { is_active: false, ..coupon(DiscountType::Fixed, dec!(5)) }, CouponRejection::InvalidOrExpired)]
    #[case::not_started(Coupon { valid_from: Utc::now() + Duration::days(1), ..coupon(DiscountType::Fixed, dec!(5)) }, CouponRejection::InvalidOrExpired)]
    #[case::exhausted(Coupon { usage_limit: Some(3), used_count: 3, ..coupon(DiscountType::Fixed, dec!(5)) }, CouponRejection::UsageLimitReached)]
    #[case::below_minimum(Coupon { minimum_amount: dec!(50), ..coupon(DiscountType::Fixed, dec!(5)) }, CouponRejection::BelowMinimum { minimum: dec!(50.00), currency: "AED".into() })]
    fn test_static_rejections(#[case] c: Coupon, #[case] expected: CouponRejection) {
        assert_eq!(c.check_static(dec!(20), Utc::now(), "AED"), Err(expected));
    }

    #[test]
    fn test_below_minimum_message() {
        let rejection = CouponRejection::BelowMinimum { minimum: dec!(50.00), currency: "AED".into() };
        assert_eq!(rejection.to_string(), "Minimum order amount of 50.00 AED required");
        assert_eq!(rejection.reason(), "below_minimum");
    }

    #[test]
    fn test_valid_until_is_exclusive() {
        let now = Utc::now();
        let c = Coupon { valid_until: Some(now), ..coupon(DiscountType::Fixed, dec!(5)) };
        assert!(!c.is_live_at(now));
        assert!(c.is_live_at(now - Duration::seconds(1)));
    }

    proptest! {
        #[test]
        fn discount_never_exceeds_cap_or_total(
            total_cents in 0i64..10_000_000,
            percent in 0u32..=100,
            cap_cents in 0i64..1_000_000,
        ) {
            let total = Decimal::new(total_cents, 2);
            let cap = Decimal::new(cap_cents, 2);
            let c = Coupon { maximum_discount: Some(cap), ..coupon(DiscountType::Percentage, Decimal::from(percent)) };
            let discount = c.discount_for(total);
            prop_assert!(discount <= cap);
            prop_assert!(discount <= total);
            prop_assert!(discount >= Decimal::ZERO);
        }

        #[test]
        fn discount_never_exceeds_unrounded_total(
            total_millis in 0i64..100_000_000,
            percent in 0u32..=100,
            fixed_millis in 0i64..100_000_000,
        ) {
            let total = Decimal::new(total_millis, 3);
            let percentage = coupon(DiscountType::Percentage, Decimal::from(percent));
            let fixed = coupon(DiscountType::Fixed, Decimal::new(fixed_millis, 3));
            for c in [percentage, fixed] {
                let discount = c.discount_for(total);
                prop_assert!(discount <= total, "discount {} > total {}", discount, total);
                prop_assert!(discount >= Decimal::ZERO);
                prop_assert_eq!(discount.scale(), 2);
            }
        }
    }
}
