use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{ApiError, AppState};
use crate::domain::aggregates::{CartError, CartView, MergeOutcome};
use crate::domain::value_objects::GuestToken;
use crate::services::CartIdentity;

fn one() -> i32 { 1 }

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[serde(default = "one")]
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest { pub item_id: Uuid, pub quantity: i32 }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemParams { pub item_id: Uuid }

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrateRequest { pub guest_cart_id: Option<String> }

/// Returns the cart. A signed-in shopper still carrying a guest cookie gets
/// the guest cart merged first.
pub async fn get_cart(State(s): State<AppState>, identity: CartIdentity) -> Result<(CookieJar, Json<CartView>), ApiError> {
    let mut jar = s.cookies.for_identity(&identity);
    if let (Some(guest), Some(user)) = (&identity.pending_guest, identity.scope.user_id()) {
        s.carts.merge_after_login(guest, user).await;
        jar = s.cookies.clear_cart(jar);
    }
    let view = s.carts.list(&identity.scope).await?;
    Ok((jar, Json(view)))
}

pub async fn add_item(State(s): State<AppState>, identity: CartIdentity, Json(r): Json<AddItemRequest>) -> Result<(StatusCode, CookieJar, Json<CartView>), ApiError> {
    r.validate()?;
    let jar = s.cookies.for_identity(&identity);
    s.carts.add(&identity.scope, r.product_id, r.quantity).await?;
    let view = s.carts.list(&identity.scope).await?;
    Ok((StatusCode::CREATED, jar, Json(view)))
}

pub async fn update_item(State(s): State<AppState>, identity: CartIdentity, Json(r): Json<UpdateItemRequest>) -> Result<(CookieJar, Json<CartView>), ApiError> {
    let jar = s.cookies.for_identity(&identity);
    s.carts.update_quantity(&identity.scope, r.item_id, r.quantity).await?;
    let view = s.carts.list(&identity.scope).await?;
    Ok((jar, Json(view)))
}

pub async fn remove_item(State(s): State<AppState>, identity: CartIdentity, Query(p): Query<RemoveItemParams>) -> Result<(CookieJar, Json<CartView>), ApiError> {
    let jar = s.cookies.for_identity(&identity);
    s.carts.remove(&identity.scope, p.item_id).await?;
    let view = s.carts.list(&identity.scope).await?;
    Ok((jar, Json(view)))
}

/// Merges a guest cart into the caller's cart. The guest id comes from the
/// body, falling back to the guest cookie.
pub async fn migrate(State(s): State<AppState>, identity: CartIdentity, body: Option<Json<MigrateRequest>>) -> Result<(CookieJar, Json<MergeOutcome>), ApiError> {
    let user = identity.scope.user_id().ok_or(CartError::Unauthorized)?;
    let r = body.map(|Json(r)| r).unwrap_or_default();
    let guest = r.guest_cart_id.as_deref().and_then(|raw| GuestToken::parse(raw).ok()).or_else(|| identity.pending_guest.clone());

    let mut jar = s.cookies.for_identity(&identity);
    let outcome = match guest {
        Some(guest) => s.carts.merge(&guest, user).await?,
        None => MergeOutcome::default(),
    };
    jar = s.cookies.clear_cart(jar);
    Ok((jar, Json(outcome)))
}
