//! Cart Aggregate
//!
//! Cart lines live in the store; this module holds the rules applied to them:
//! stock bounds for add/update, the priced cart view, and the guest-to-user
//! merge plan.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::Product;
use crate::domain::value_objects::{round_currency, CartScope, GuestToken};
use crate::StoreError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CartLine {
    pub id: Uuid,
    pub scope: CartScope,
    pub product_id: Uuid,
    pub quantity: i32,
}

/// A cart line joined with its product.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub images: Vec<String>,
    pub stock: i32,
    pub quantity: i32,
    pub line_total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub cart_id: String,
    pub items: Vec<CartLineView>,
    pub item_count: i64,
    pub total: Decimal,
}

impl CartView {
    /// Prices `lines` against `products`. Lines whose product is gone are skipped.
    pub fn assemble(scope: &CartScope, lines: Vec<CartLine>, products: &[Product]) -> Self {
        let by_id: HashMap<Uuid, &Product> = products.iter().map(|p| (p.id, p)).collect();
        let items: Vec<CartLineView> = lines
            .into_iter()
            .filter_map(|line| {
                let product = by_id.get(&line.product_id)?;
                Some(CartLineView {
                    id: line.id,
                    product_id: line.product_id,
                    name: product.name.clone(),
                    price: product.price,
                    images: product.images.clone(),
                    stock: product.stock,
                    quantity: line.quantity,
                    line_total: product.price * Decimal::from(line.quantity),
                })
            })
            .collect();
        let total = round_currency(items.iter().map(|i| i.line_total).sum());
        let item_count = items.iter().map(|i| i64::from(i.quantity)).sum();
        Self { cart_id: scope.key(), items, item_count, total }
    }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }
}

/// Checks that `requested` more units fit on top of `existing`.
pub fn check_add(product: &Product, existing: i32, requested: i32) -> Result<(), CartError> {
    if requested < 1 { return Err(CartError::InvalidQuantity); }
    if !product.is_in_stock() {
        return Err(CartError::OutOfStock { name: product.name.clone() });
    }
    match existing.checked_add(requested) {
        Some(total) if total <= product.stock => Ok(()),
        _ => Err(CartError::InsufficientStock { available: product.stock }),
    }
}

/// Checks that a line may be set to exactly `requested` units.
pub fn check_set(product: &Product, requested: i32) -> Result<(), CartError> {
    if requested > product.stock {
        return Err(CartError::InsufficientStock { available: product.stock.max(0) });
    }
    Ok(())
}

// =============================================================================
// Merge
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    pub migrated_count: usize,
    pub merged_count: usize,
}

/// Add `quantity` to an existing user line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeIncrement { pub line_id: Uuid, pub product_id: Uuid, pub quantity: i32 }

/// Create a user line for a product the user did not have.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeInsert { pub product_id: Uuid, pub quantity: i32 }

/// Writes needed to fold a guest cart into a user cart.
///
/// Stock is not re-checked: a merged line may exceed current stock until the
/// shopper next edits it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergePlan {
    pub increments: Vec<MergeIncrement>,
    pub inserts: Vec<MergeInsert>,
    /// Guest line ids to delete once the writes above are applied.
    pub consumed: Vec<Uuid>,
}

impl MergePlan {
    pub fn build(guest_token: &GuestToken, guest_lines: &[CartLine], user_lines: &[CartLine]) -> Self {
        let user_by_product: HashMap<Uuid, Uuid> = user_lines.iter().map(|l| (l.product_id, l.id)).collect();
        let mut plan = Self::default();

        for line in guest_lines.iter().filter(|l| l.scope.guest_token() == Some(guest_token)) {
            plan.consumed.push(line.id);
            if let Some(&line_id) = user_by_product.get(&line.product_id) {
                plan.increments.push(MergeIncrement { line_id, product_id: line.product_id, quantity: line.quantity });
            } else if let Some(pending) = plan.inserts.iter_mut().find(|i| i.product_id == line.product_id) {
                pending.quantity = pending.quantity.saturating_add(line.quantity);
            } else {
                plan.inserts.push(MergeInsert { product_id: line.product_id, quantity: line.quantity });
            }
        }
        plan
    }

    pub fn is_empty(&self) -> bool { self.consumed.is_empty() }

    pub fn outcome(&self) -> MergeOutcome {
        MergeOutcome { migrated_count: self.inserts.len(), merged_count: self.increments.len() }
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Error, Debug)]
pub enum CartError {
    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Product not found")]
    ProductNotFound(Uuid),

    #[error("Cart item not found")]
    LineNotFound(Uuid),

    #[error("{name} is out of stock")]
    OutOfStock { name: String },

    #[error("Only {available} items available")]
    InsufficientStock { available: i32 },

    #[error("Sign in to merge a guest cart")]
    Unauthorized,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::UserId;
    use rust_decimal_macros::dec;

    fn product(stock: i32) -> Product {
        Product { id: Uuid::new_v4(), name: "Dates Box".into(), price: dec!(12.50), stock, images: vec![] }
    }

    fn line(scope: &CartScope, product_id: Uuid, quantity: i32) -> CartLine {
        CartLine { id: Uuid::new_v4(), scope: scope.clone(), product_id, quantity }
    }

    #[test]
    fn test_check_add() {
        let p = product(5);
        assert!(check_add(&p, 0, 5).is_ok());
        assert!(matches!(check_add(&p, 3, 3), Err(CartError::InsufficientStock { available: 5 })));
        assert!(matches!(check_add(&p, 0, 0), Err(CartError::InvalidQuantity)));
        assert!(matches!(check_add(&product(0), 0, 1), Err(CartError::OutOfStock { .. })));
        assert!(matches!(check_add(&p, i32::MAX, 1), Err(CartError::InsufficientStock { .. })));
    }

    #[test]
    fn test_insufficient_stock_message() {
        let err = check_add(&product(3), 0, 4).unwrap_err();
        assert_eq!(err.to_string(), "Only 3 items available");
    }

    #[test]
    fn test_view_totals() {
        let scope = CartScope::User(UserId::new(Uuid::new_v4()));
        let a = product(10);
        let b = Product { price: dec!(3.10), ..product(10) };
        let lines = vec![line(&scope, a.id, 2), line(&scope, b.id, 3), line(&scope, Uuid::new_v4(), 1)];
        let view = CartView::assemble(&scope, lines, &[a, b]);
        assert_eq!(view.items.len(), 2); // orphaned line skipped
        assert_eq!(view.total, dec!(34.30));
        assert_eq!(view.item_count, 5);
        assert_eq!(view.cart_id, scope.key());
    }

    #[test]
    fn test_merge_plan() {
        let token = GuestToken::mint();
        let guest = CartScope::Guest(token.clone());
        let user = CartScope::User(UserId::new(Uuid::new_v4()));
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let user_lines = vec![line(&user, a, 1), line(&user, b, 3)];
        let guest_lines = vec![line(&guest, a, 2), line(&guest, c, 4), line(&user, b, 9)];
        let plan = MergePlan::build(&token, &guest_lines, &user_lines);

        assert_eq!(plan.increments, vec![MergeIncrement { line_id: user_lines[0].id, product_id: a, quantity: 2 }]);
        assert_eq!(plan.inserts, vec![MergeInsert { product_id: c, quantity: 4 }]);
        // the user-owned row slipped into the guest read is left alone
        assert_eq!(plan.consumed, vec![guest_lines[0].id, guest_lines[1].id]);
        assert_eq!(plan.outcome(), MergeOutcome { migrated_count: 1, merged_count: 1 });
    }

    #[test]
    fn test_merge_plan_empty() {
        let plan = MergePlan::build(&GuestToken::mint(), &[], &[]);
        assert!(plan.is_empty());
        assert_eq!(plan.outcome(), MergeOutcome::default());
    }
}
