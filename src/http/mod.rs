//! HTTP surface: router, shared state and the cart identity extractor.

use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts, routing::{get, post}, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::ports::RateLimiter;
use crate::services::{CartIdentity, CartIdentityResolver, CartService, CouponService};

pub mod cart;
pub mod cookies;
pub mod coupons;
pub mod error;

pub use cookies::CookieSettings;
pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub carts: CartService,
    pub coupons: CouponService,
    pub identity: CartIdentityResolver,
    pub limiter: Arc<dyn RateLimiter>,
    pub cookies: CookieSettings,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "souq-cart"})) }))
        .route("/api/v1/cart", get(cart::get_cart).post(cart::add_item).put(cart::update_item).delete(cart::remove_item))
        .route("/api/v1/cart/migrate", post(cart::migrate))
        .route("/api/v1/coupons/validate", post(coupons::validate))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

#[async_trait]
impl FromRequestParts<AppState> for CartIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let (guest, session) = cookies::request_tokens(&CookieJar::from_headers(&parts.headers));
        Ok(state.identity.resolve(session.as_deref(), guest.as_deref()).await?)
    }
}
