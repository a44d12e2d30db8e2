use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState};
use crate::domain::aggregates::CouponRejection;
use crate::services::{CartIdentity, CouponError, ValidCoupon};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponRequest {
    #[serde(default)]
    pub code: String,
    pub cart_total: Decimal,
}

/// `{valid: true, discountAmount, coupon}` or `{valid: false, reason, message}`.
#[derive(Debug, Serialize)]
pub struct CouponCheck {
    pub valid: bool,
    #[serde(flatten)]
    pub result: Option<ValidCoupon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CouponCheck {
    fn accepted(valid: ValidCoupon) -> Self {
        Self { valid: true, result: Some(valid), reason: None, message: None }
    }

    fn rejected(rejection: &CouponRejection) -> Self {
        Self { valid: false, result: None, reason: Some(rejection.reason()), message: Some(rejection.to_string()) }
    }
}

pub async fn validate(State(s): State<AppState>, identity: CartIdentity, Json(r): Json<ValidateCouponRequest>) -> Result<(CookieJar, Json<CouponCheck>), ApiError> {
    if r.cart_total < Decimal::ZERO {
        return Err(ApiError::BadRequest("cartTotal must not be negative".to_string()));
    }
    if !s.limiter.allow(&identity.scope.key()).await {
        return Err(ApiError::RateLimited);
    }

    let jar = s.cookies.for_identity(&identity);
    let check = match s.coupons.validate(&r.code, r.cart_total, identity.scope.user_id()).await {
        Ok(valid) => CouponCheck::accepted(valid),
        Err(CouponError::Rejected(rejection)) => CouponCheck::rejected(&rejection),
        Err(CouponError::Store(err)) => return Err(err.into()),
    };
    Ok((jar, Json(check)))
}
