//! PostgreSQL adapters (sqlx)
//!
//! A cart line row carries exactly one of `guest_token` / `user_id`. Scope
//! filters compare only the owning column, so the per-owner partial indexes
//! on `cart_items` serve every cart read and write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::{CartLine, Coupon, MergePlan, Product};
use crate::domain::value_objects::{CartScope, CouponCode, GuestToken, UserId};
use crate::ports::{CartRepository, Consumption, CouponRepository, ProductCatalog, SessionResolver};
use crate::{StoreError, StoreResult};


#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

/// Predicate on `$1` selecting the scope's lines, and the value to bind.
fn scope_filter(scope: &CartScope) -> (&'static str, String) {
    match scope {
        CartScope::Guest(token) => ("guest_token = $1", token.as_str().to_string()),
        CartScope::User(id) => ("user_id = CAST($1 AS UUID)", id.as_uuid().to_string()),
    }
}

fn scope_binds(scope: &CartScope) -> (Option<&str>, Option<Uuid>) {
    match scope {
        CartScope::Guest(token) => (Some(token.as_str()), None),
        CartScope::User(id) => (None, Some(id.as_uuid())),
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow { id: Uuid, guest_token: Option<String>, user_id: Option<Uuid>, product_id: Uuid, quantity: i32 }

impl TryFrom<CartLineRow> for CartLine {
    type Error = StoreError;
    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let scope = match (row.guest_token, row.user_id) {
            (None, Some(user)) => CartScope::User(UserId::new(user)),
            (Some(token), None) => CartScope::Guest(
                GuestToken::parse(&token).map_err(|e| StoreError::Corrupt(format!("cart line {}: {e}", row.id)))?,
            ),
            _ => return Err(StoreError::Corrupt(format!("cart line {} has no single owner", row.id))),
        };
        Ok(CartLine { id: row.id, scope, product_id: row.product_id, quantity: row.quantity })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: Uuid, code: String, discount_type: String, discount_value: Decimal,
    minimum_amount: Option<Decimal>, maximum_discount: Option<Decimal>,
    usage_limit: Option<i32>, used_count: i32,
    valid_from: DateTime<Utc>, valid_until: Option<DateTime<Utc>>,
    is_active: bool, for_new_users_only: bool,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = StoreError;
    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        Ok(Coupon {
            id: row.id,
            code: row.code.to_uppercase(),
            discount_type: row.discount_type.parse().map_err(StoreError::Corrupt)?,
            discount_value: row.discount_value,
            minimum_amount: row.minimum_amount.unwrap_or(Decimal::ZERO),
            maximum_discount: row.maximum_discount,
            usage_limit: row.usage_limit,
            used_count: row.used_count,
            valid_from: row.valid_from,
            valid_until: row.valid_until,
            is_active: row.is_active,
            for_new_users_only: row.for_new_users_only,
        })
    }
}

// =============================================================================
// Products
// =============================================================================

#[async_trait]
impl ProductCatalog for PgStore {
    async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(sqlx::query_as::<_, Product>("SELECT id, name, price, stock, images FROM products WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?)
    }

    async fn list_products_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
        Ok(sqlx::query_as::<_, Product>("SELECT id, name, price, stock, images FROM products WHERE id = ANY($1)")
            .bind(ids).fetch_all(&self.pool).await?)
    }
}

// =============================================================================
// Cart lines
// =============================================================================

#[async_trait]
impl CartRepository for PgStore {
    async fn lines(&self, scope: &CartScope) -> StoreResult<Vec<CartLine>> {
        let (filter, key) = scope_filter(scope);
        let sql = format!("SELECT id, guest_token, user_id, product_id, quantity FROM cart_items WHERE {filter} ORDER BY created_at, id");
        sqlx::query_as::<_, CartLineRow>(&sql)
            .bind(key).fetch_all(&self.pool).await?
            .into_iter().map(CartLine::try_from).collect()
    }

    async fn line_for_product(&self, scope: &CartScope, product_id: Uuid) -> StoreResult<Option<CartLine>> {
        let (filter, key) = scope_filter(scope);
        let sql = format!("SELECT id, guest_token, user_id, product_id, quantity FROM cart_items WHERE {filter} AND product_id = $2");
        sqlx::query_as::<_, CartLineRow>(&sql)
            .bind(key).bind(product_id).fetch_optional(&self.pool).await?
            .map(CartLine::try_from).transpose()
    }

    async fn owned_line(&self, scope: &CartScope, line_id: Uuid) -> StoreResult<Option<CartLine>> {
        let (filter, key) = scope_filter(scope);
        let sql = format!("SELECT id, guest_token, user_id, product_id, quantity FROM cart_items WHERE {filter} AND id = $2");
        sqlx::query_as::<_, CartLineRow>(&sql)
            .bind(key).bind(line_id).fetch_optional(&self.pool).await?
            .map(CartLine::try_from).transpose()
    }

    async fn insert_line(&self, scope: &CartScope, product_id: Uuid, quantity: i32) -> StoreResult<CartLine> {
        let (guest, user) = scope_binds(scope);
        sqlx::query_as::<_, CartLineRow>("INSERT INTO cart_items (id, guest_token, user_id, product_id, quantity, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, NOW(), NOW()) RETURNING id, guest_token, user_id, product_id, quantity")
            .bind(Uuid::now_v7()).bind(guest).bind(user).bind(product_id).bind(quantity)
            .fetch_one(&self.pool).await?
            .try_into()
    }

    async fn set_quantity(&self, scope: &CartScope, line_id: Uuid, quantity: i32) -> StoreResult<()> {
        let (filter, key) = scope_filter(scope);
        let sql = format!("UPDATE cart_items SET quantity = $3, updated_at = NOW() WHERE {filter} AND id = $2");
        sqlx::query(&sql).bind(key).bind(line_id).bind(quantity).execute(&self.pool).await?;
        Ok(())
    }

    async fn delete_line(&self, scope: &CartScope, line_id: Uuid) -> StoreResult<bool> {
        let (filter, key) = scope_filter(scope);
        let sql = format!("DELETE FROM cart_items WHERE {filter} AND id = $2");
        let done = sqlx::query(&sql).bind(key).bind(line_id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn apply_merge(&self, user: UserId, plan: &MergePlan) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for inc in &plan.increments {
            sqlx::query("UPDATE cart_items SET quantity = quantity + $3, updated_at = NOW() WHERE id = $1 AND user_id = $2")
                .bind(inc.line_id).bind(user.as_uuid()).bind(inc.quantity).execute(&mut *tx).await?;
        }
        for ins in &plan.inserts {
            sqlx::query("INSERT INTO cart_items (id, guest_token, user_id, product_id, quantity, created_at, updated_at) VALUES ($1, NULL, $2, $3, $4, NOW(), NOW())")
                .bind(Uuid::now_v7()).bind(user.as_uuid()).bind(ins.product_id).bind(ins.quantity).execute(&mut *tx).await?;
        }
        sqlx::query("DELETE FROM cart_items WHERE id = ANY($1) AND guest_token IS NOT NULL")
            .bind(&plan.consumed[..]).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }
}

// =============================================================================
// Coupons
// =============================================================================

#[async_trait]
impl CouponRepository for PgStore {
    async fn find_by_code(&self, code: &CouponCode) -> StoreResult<Option<Coupon>> {
        sqlx::query_as::<_, CouponRow>("SELECT id, code, discount_type, discount_value, minimum_amount, maximum_discount, usage_limit, used_count, valid_from, valid_until, is_active, for_new_users_only FROM coupons WHERE UPPER(code) = $1")
            .bind(code.as_str()).fetch_optional(&self.pool).await?
            .map(Coupon::try_from).transpose()
    }

    async fn order_count(&self, user: UserId) -> StoreResult<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user.as_uuid()).fetch_one(&self.pool).await?;
        Ok(count.0)
    }

    async fn has_usage(&self, coupon_id: Uuid, user: UserId) -> StoreResult<bool> {
        let found: (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM coupon_usage WHERE coupon_id = $1 AND user_id = $2)")
            .bind(coupon_id).bind(user.as_uuid()).fetch_one(&self.pool).await?;
        Ok(found.0)
    }

    async fn consume(&self, coupon_id: Uuid, user: UserId, order_id: Uuid) -> StoreResult<Consumption> {
        let mut tx = self.pool.begin().await?;
        let bumped = sqlx::query("UPDATE coupons SET used_count = used_count + 1, updated_at = NOW() WHERE id = $1 AND (usage_limit IS NULL OR used_count < usage_limit)")
            .bind(coupon_id).execute(&mut *tx).await?;
        if bumped.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(Consumption::LimitReached);
        }
        let recorded = sqlx::query("INSERT INTO coupon_usage (id, coupon_id, user_id, order_id, used_at) VALUES ($1, $2, $3, $4, NOW()) ON CONFLICT (coupon_id, user_id) DO NOTHING")
            .bind(Uuid::now_v7()).bind(coupon_id).bind(user.as_uuid()).bind(order_id).execute(&mut *tx).await?;
        if recorded.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(Consumption::AlreadyUsed);
        }
        tx.commit().await?;
        Ok(Consumption::Recorded)
    }
}

// =============================================================================
// Sessions
// =============================================================================

#[async_trait]
impl SessionResolver for PgStore {
    async fn resolve(&self, token: &str) -> StoreResult<Option<UserId>> {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT user_id FROM sessions WHERE token = $1 AND expires_at > NOW()")
            .bind(token).fetch_optional(&self.pool).await?;
        Ok(row.map(|(id,)| UserId::new(id)))
    }
}
