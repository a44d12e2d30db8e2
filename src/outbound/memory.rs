//! In-memory adapters for tests
//!
//! One [`MemoryStore`] implements every storage port so a test can seed
//! products, coupons and sessions and then drive the services or the router.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::aggregates::{CartLine, Coupon, MergePlan, Product};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{CartScope, CouponCode, UserId};
use crate::ports::{CartRepository, Consumption, CouponRepository, EventPublisher, ProductCatalog, SessionResolver};
use crate::{StoreError, StoreResult};

#[derive(Default)]
struct State {
    products: HashMap<Uuid, Product>,
    lines: Vec<CartLine>,
    coupons: HashMap<String, Coupon>,
    usages: HashSet<(Uuid, UserId)>,
    orders: HashMap<UserId, i64>,
    sessions: HashMap<String, (UserId, DateTime<Utc>)>,
    fail_merges: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    fn state(&self) -> MutexGuard<'_, State> { self.state.lock().unwrap_or_else(PoisonError::into_inner) }

    pub fn add_product(&self, name: &str, price: Decimal, stock: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.state().products.insert(id, Product { id, name: name.to_string(), price, stock, images: vec![] });
        id
    }

    pub fn set_stock(&self, product_id: Uuid, stock: i32) {
        if let Some(p) = self.state().products.get_mut(&product_id) { p.stock = stock; }
    }

    pub fn add_coupon(&self, coupon: Coupon) {
        self.state().coupons.insert(coupon.code.to_uppercase(), coupon);
    }

    pub fn coupon_used_count(&self, code: &str) -> Option<i32> {
        self.state().coupons.get(&code.to_uppercase()).map(|c| c.used_count)
    }

    pub fn record_order(&self, user: UserId) {
        *self.state().orders.entry(user).or_default() += 1;
    }

    pub fn add_session(&self, token: &str, user: UserId, expires_at: DateTime<Utc>) {
        self.state().sessions.insert(token.to_string(), (user, expires_at));
    }

    /// Makes every subsequent `apply_merge` fail without writing.
    pub fn fail_merges(&self, fail: bool) { self.state().fail_merges = fail; }
}

#[async_trait]
impl ProductCatalog for MemoryStore {
    async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.state().products.get(&id).cloned())
    }

    async fn list_products_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
        let state = self.state();
        Ok(ids.iter().filter_map(|id| state.products.get(id).cloned()).collect())
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn lines(&self, scope: &CartScope) -> StoreResult<Vec<CartLine>> {
        Ok(self.state().lines.iter().filter(|l| &l.scope == scope).cloned().collect())
    }

    async fn line_for_product(&self, scope: &CartScope, product_id: Uuid) -> StoreResult<Option<CartLine>> {
        Ok(self.state().lines.iter().find(|l| &l.scope == scope && l.product_id == product_id).cloned())
    }

    async fn owned_line(&self, scope: &CartScope, line_id: Uuid) -> StoreResult<Option<CartLine>> {
        Ok(self.state().lines.iter().find(|l| &l.scope == scope && l.id == line_id).cloned())
    }

    async fn insert_line(&self, scope: &CartScope, product_id: Uuid, quantity: i32) -> StoreResult<CartLine> {
        let line = CartLine { id: Uuid::new_v4(), scope: scope.clone(), product_id, quantity };
        self.state().lines.push(line.clone());
        Ok(line)
    }

    async fn set_quantity(&self, scope: &CartScope, line_id: Uuid, quantity: i32) -> StoreResult<()> {
        if let Some(line) = self.state().lines.iter_mut().find(|l| &l.scope == scope && l.id == line_id) {
            line.quantity = quantity;
        }
        Ok(())
    }

    async fn delete_line(&self, scope: &CartScope, line_id: Uuid) -> StoreResult<bool> {
        let mut state = self.state();
        let before = state.lines.len();
        state.lines.retain(|l| !(&l.scope == scope && l.id == line_id));
        Ok(state.lines.len() != before)
    }

    async fn apply_merge(&self, user: UserId, plan: &MergePlan) -> StoreResult<()> {
        let mut state = self.state();
        if state.fail_merges { return Err(StoreError::Unavailable("merge disabled".into())); }
        let owner = CartScope::User(user);
        for inc in &plan.increments {
            if let Some(line) = state.lines.iter_mut().find(|l| l.id == inc.line_id && l.scope == owner) {
                line.quantity = line.quantity.saturating_add(inc.quantity);
            }
        }
        for ins in &plan.inserts {
            state.lines.push(CartLine { id: Uuid::new_v4(), scope: owner.clone(), product_id: ins.product_id, quantity: ins.quantity });
        }
        state.lines.retain(|l| !(plan.consumed.contains(&l.id) && !l.scope.is_authenticated()));
        Ok(())
    }
}

#[async_trait]
impl CouponRepository for MemoryStore {
    async fn find_by_code(&self, code: &CouponCode) -> StoreResult<Option<Coupon>> {
        Ok(self.state().coupons.get(code.as_str()).cloned())
    }

    async fn order_count(&self, user: UserId) -> StoreResult<i64> {
        Ok(self.state().orders.get(&user).copied().unwrap_or(0))
    }

    async fn has_usage(&self, coupon_id: Uuid, user: UserId) -> StoreResult<bool> {
        Ok(self.state().usages.contains(&(coupon_id, user)))
    }

    async fn consume(&self, coupon_id: Uuid, user: UserId, _order_id: Uuid) -> StoreResult<Consumption> {
        let mut state = self.state();
        if state.usages.contains(&(coupon_id, user)) { return Ok(Consumption::AlreadyUsed); }
        let Some(coupon) = state.coupons.values_mut().find(|c| c.id == coupon_id) else {
            return Ok(Consumption::LimitReached);
        };
        if !coupon.has_uses_left() { return Ok(Consumption::LimitReached); }
        coupon.used_count += 1;
        state.usages.insert((coupon_id, user));
        Ok(Consumption::Recorded)
    }
}

#[async_trait]
impl SessionResolver for MemoryStore {
    async fn resolve(&self, token: &str) -> StoreResult<Option<UserId>> {
        Ok(self.state().sessions.get(token).filter(|(_, expires)| *expires > Utc::now()).map(|(user, _)| *user))
    }
}

/// Publisher that keeps every event for assertions.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingPublisher {
    pub fn published(&self) -> Vec<DomainEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: DomainEvent) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }
}
