use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::aggregates::{Coupon, CouponRejection, DiscountType};
use crate::domain::events::{CouponEvent, DomainEvent};
use crate::domain::value_objects::{CouponCode, UserId};
use crate::ports::{Consumption, CouponRepository, EventPublisher};
use crate::StoreError;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponSummary {
    pub id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidCoupon {
    pub discount_amount: Decimal,
    pub coupon: CouponSummary,
}

#[derive(Error, Debug)]
pub enum CouponError {
    #[error(transparent)]
    Rejected(#[from] CouponRejection),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Coupon validation (advisory) and redemption (authoritative).
#[derive(Clone)]
pub struct CouponService {
    coupons: Arc<dyn CouponRepository>,
    events: Arc<dyn EventPublisher>,
    currency: String,
}

impl CouponService {
    pub fn new(coupons: Arc<dyn CouponRepository>, events: Arc<dyn EventPublisher>, currency: impl Into<String>) -> Self {
        Self { coupons, events, currency: currency.into() }
    }

    /// Checks eligibility and computes the discount. Does not reserve the
    /// coupon; two checkouts may both pass for a single-use code.
    #[instrument(skip(self))]
    pub async fn validate(&self, code: &str, cart_total: Decimal, user: Option<UserId>) -> Result<ValidCoupon, CouponError> {
        let result = self.evaluate(code, cart_total, user, Utc::now()).await;
        if let Err(CouponError::Rejected(rejection)) = &result {
            debug!(reason = rejection.reason(), "coupon rejected");
        }
        result.map(|(_, valid)| valid)
    }

    /// Re-validates and consumes the coupon for `order_id`.
    #[instrument(skip(self))]
    pub async fn redeem(&self, code: &str, cart_total: Decimal, user: UserId, order_id: Uuid) -> Result<ValidCoupon, CouponError> {
        let (coupon, valid) = self.evaluate(code, cart_total, Some(user), Utc::now()).await?;

        match self.coupons.consume(coupon.id, user, order_id).await? {
            Consumption::Recorded => {}
            Consumption::LimitReached => return Err(CouponRejection::UsageLimitReached.into()),
            Consumption::AlreadyUsed => return Err(CouponRejection::AlreadyUsed.into()),
        }
        info!(code = %coupon.code, %user, %order_id, "coupon redeemed");

        self.events
            .publish(DomainEvent::Coupon(CouponEvent::Redeemed {
                coupon_id: coupon.id,
                code: coupon.code.clone(),
                user_id: user,
                order_id,
                discount_amount: valid.discount_amount,
            }))
            .await;
        Ok(valid)
    }

    async fn evaluate(
        &self,
        code: &str,
        cart_total: Decimal,
        user: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<(Coupon, ValidCoupon), CouponError> {
        let code = CouponCode::new(code).ok_or(CouponRejection::CodeRequired)?;
        let coupon = self.coupons.find_by_code(&code).await?.ok_or(CouponRejection::InvalidOrExpired)?;
        coupon.check_static(cart_total, now, &self.currency)?;

        if coupon.for_new_users_only {
            if let Some(user) = user {
                if self.coupons.order_count(user).await? > 0 {
                    return Err(CouponRejection::NotNewCustomer.into());
                }
            }
        }
        if let Some(user) = user {
            if self.coupons.has_usage(coupon.id, user).await? {
                return Err(CouponRejection::AlreadyUsed.into());
            }
        }

        let valid = ValidCoupon {
            discount_amount: coupon.discount_for(cart_total),
            coupon: CouponSummary {
                id: coupon.id,
                code: coupon.code.clone(),
                discount_type: coupon.discount_type,
                discount_value: coupon.discount_value,
            },
        };
        Ok((coupon, valid))
    }
}
