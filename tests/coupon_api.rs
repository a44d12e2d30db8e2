//! Coupon validation endpoint.

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::TestApp;
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use souq_cart::{Coupon, DiscountType};
use uuid::Uuid;

fn coupon(code: &str) -> Coupon {
    Coupon {
        id: Uuid::new_v4(),
        code: code.to_string(),
        discount_type: DiscountType::Percentage,
        discount_value: dec!(20),
        minimum_amount: Decimal::ZERO,
        maximum_discount: Some(dec!(15.00)),
        usage_limit: None,
        used_count: 0,
        valid_from: Utc::now() - Duration::days(7),
        valid_until: Some(Utc::now() + Duration::days(7)),
        is_active: true,
        for_new_users_only: false,
    }
}

#[tokio::test]
async fn welcome20_on_eighty_is_capped_at_fifteen() {
    let app = TestApp::new();
    app.store.add_coupon(coupon("WELCOME20"));

    let response = app
        .request(Method::POST, "/api/v1/coupons/validate", &[("cart_id", "guest-c")], Some(json!({"code": "welcome20", "cartTotal": "80.00"})))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["valid"], true);
    assert_eq!(response.body["discountAmount"], "15.00");
    assert_eq!(response.body["coupon"]["code"], "WELCOME20");
    assert_eq!(response.body["coupon"]["discountType"], "percentage");
}

#[rstest]
#[case::missing_code("", "code_required")]
#[case::unknown("NOPE", "invalid_or_expired")]
#[case::expired("EXPIRED", "invalid_or_expired")]
#[case::exhausted("GONE", "usage_limit_reached")]
#[case::below_minimum("BIGSPEND", "below_minimum")]
#[tokio::test]
async fn rejections_report_first_failing_check(#[case] code: &str, #[case] reason: &str) {
    let app = TestApp::new();
    // expired and below minimum: the window check wins
    app.store.add_coupon(Coupon { valid_until: Some(Utc::now() - Duration::days(1)), minimum_amount: dec!(500), ..coupon("EXPIRED") });
    app.store.add_coupon(Coupon { usage_limit: Some(5), used_count: 5, ..coupon("GONE") });
    app.store.add_coupon(Coupon { minimum_amount: dec!(200), ..coupon("BIGSPEND") });

    let response = app
        .request(Method::POST, "/api/v1/coupons/validate", &[("cart_id", "guest-r")], Some(json!({"code": code, "cartTotal": "50.00"})))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["valid"], false);
    assert_eq!(response.body["reason"], reason);
    assert!(response.body["message"].as_str().is_some_and(|m| !m.is_empty()));
}

#[tokio::test]
async fn below_minimum_names_the_required_amount() {
    let app = TestApp::new();
    app.store.add_coupon(Coupon { minimum_amount: dec!(100), ..coupon("BIGSPEND") });

    let response = app
        .request(Method::POST, "/api/v1/coupons/validate", &[("cart_id", "guest-m")], Some(json!({"code": "BIGSPEND", "cartTotal": "99.99"})))
        .await;
    assert_eq!(response.body["message"], "Minimum order amount of 100.00 AED required");
}

#[tokio::test]
async fn signed_in_shopper_cannot_reuse_coupon() {
    let app = TestApp::new();
    app.store.add_coupon(coupon("WELCOME20"));
    let (session, user) = app.sign_in();
    let cookies = [("session_token", session.as_str())];

    let first = app.request(Method::POST, "/api/v1/coupons/validate", &cookies, Some(json!({"code": "WELCOME20", "cartTotal": "40.00"}))).await;
    assert_eq!(first.body["valid"], true);
    assert_eq!(first.body["discountAmount"], "8.00");

    let coupons = souq_cart::services::CouponService::new(app.store.clone(), app.events.clone(), "AED");
    coupons.redeem("WELCOME20", dec!(40.00), user, Uuid::new_v4()).await.expect("redeem");

    let again = app.request(Method::POST, "/api/v1/coupons/validate", &cookies, Some(json!({"code": "WELCOME20", "cartTotal": "40.00"}))).await;
    assert_eq!(again.body["valid"], false);
    assert_eq!(again.body["reason"], "already_used");
}

#[tokio::test]
async fn new_customer_coupon_rejects_returning_customer() {
    let app = TestApp::new();
    app.store.add_coupon(Coupon { for_new_users_only: true, ..coupon("FIRST") });
    let (session, user) = app.sign_in();
    app.store.record_order(user);

    let response = app
        .request(Method::POST, "/api/v1/coupons/validate", &[("session_token", session.as_str())], Some(json!({"code": "FIRST", "cartTotal": "60.00"})))
        .await;
    assert_eq!(response.body["reason"], "not_new_customer");
}

#[tokio::test]
async fn negative_total_is_rejected() {
    let app = TestApp::new();
    let response = app
        .request(Method::POST, "/api/v1/coupons/validate", &[("cart_id", "guest-n")], Some(json!({"code": "X", "cartTotal": "-1"})))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn validation_is_rate_limited_per_cart() {
    let app = TestApp::with_rate_limit(2);
    let body = json!({"code": "NOPE", "cartTotal": "10.00"});

    for _ in 0..2 {
        let ok = app.request(Method::POST, "/api/v1/coupons/validate", &[("cart_id", "guest-rl")], Some(body.clone())).await;
        assert_eq!(ok.status, StatusCode::OK);
    }
    let limited = app.request(Method::POST, "/api/v1/coupons/validate", &[("cart_id", "guest-rl")], Some(body.clone())).await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);

    let other = app.request(Method::POST, "/api/v1/coupons/validate", &[("cart_id", "guest-other")], Some(body)).await;
    assert_eq!(other.status, StatusCode::OK);
}
