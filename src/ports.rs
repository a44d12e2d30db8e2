//! Ports the services depend on.
//!
//! PostgreSQL adapters live in [`crate::outbound::postgres`]; in-memory ones
//! back the tests.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::aggregates::{CartLine, Coupon, MergePlan, Product};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{CartScope, CouponCode, UserId};
use crate::StoreResult;

/// Product read model owned by the catalogue.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>>;
    async fn list_products_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>>;
}

/// Cart line storage. Every lookup and mutation is filtered by scope, so a
/// scope can never see or touch another scope's lines.
#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn lines(&self, scope: &CartScope) -> StoreResult<Vec<CartLine>>;
    async fn line_for_product(&self, scope: &CartScope, product_id: Uuid) -> StoreResult<Option<CartLine>>;
    async fn owned_line(&self, scope: &CartScope, line_id: Uuid) -> StoreResult<Option<CartLine>>;
    async fn insert_line(&self, scope: &CartScope, product_id: Uuid, quantity: i32) -> StoreResult<CartLine>;
    async fn set_quantity(&self, scope: &CartScope, line_id: Uuid, quantity: i32) -> StoreResult<()>;
    /// Returns whether a line was deleted.
    async fn delete_line(&self, scope: &CartScope, line_id: Uuid) -> StoreResult<bool>;
    /// Applies a merge plan for `user` all-or-nothing.
    async fn apply_merge(&self, user: UserId, plan: &MergePlan) -> StoreResult<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Consumption {
    Recorded,
    LimitReached,
    AlreadyUsed,
}

#[async_trait]
pub trait CouponRepository: Send + Sync {
    async fn find_by_code(&self, code: &CouponCode) -> StoreResult<Option<Coupon>>;
    async fn order_count(&self, user: UserId) -> StoreResult<i64>;
    async fn has_usage(&self, coupon_id: Uuid, user: UserId) -> StoreResult<bool>;
    /// Conditionally bumps `used_count` and records the usage row in one step.
    async fn consume(&self, coupon_id: Uuid, user: UserId, order_id: Uuid) -> StoreResult<Consumption>;
}

/// Auth/session service: opaque session token to user.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// `None` for unknown or expired tokens.
    async fn resolve(&self, token: &str) -> StoreResult<Option<UserId>>;
}

/// Throttling capability. Implementations own their expiry policy.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn allow(&self, key: &str) -> bool;
}

/// Fire-and-forget event sink. Delivery failures are the publisher's to log.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: DomainEvent);
}
