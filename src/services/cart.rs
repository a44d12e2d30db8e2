use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::aggregates::cart::{check_add, check_set};
use crate::domain::aggregates::{CartError, CartLine, CartView, MergeOutcome, MergePlan};
use crate::domain::events::{CartEvent, DomainEvent};
use crate::domain::value_objects::{CartScope, GuestToken, UserId};
use crate::ports::{CartRepository, EventPublisher, ProductCatalog};

/// Cart store and merge engine.
///
/// Operations are scoped to a resolved [`CartScope`]. Writes are plain
/// read-then-write; two concurrent adds for the same product may race.
#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartRepository>,
    products: Arc<dyn ProductCatalog>,
    events: Arc<dyn EventPublisher>,
}

impl CartService {
    pub fn new(
        carts: Arc<dyn CartRepository>,
        products: Arc<dyn ProductCatalog>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self { carts, products, events }
    }

    /// Lines of the scope priced against the catalogue.
    #[instrument(skip(self))]
    pub async fn list(&self, scope: &CartScope) -> Result<CartView, CartError> {
        let lines = self.carts.lines(scope).await?;
        let ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
        let products = if ids.is_empty() { Vec::new() } else { self.products.list_products_by_ids(&ids).await? };
        Ok(CartView::assemble(scope, lines, &products))
    }

    /// Adds `quantity` units, incrementing the existing line for the product if any.
    #[instrument(skip(self))]
    pub async fn add(&self, scope: &CartScope, product_id: Uuid, quantity: i32) -> Result<CartLine, CartError> {
        if quantity < 1 { return Err(CartError::InvalidQuantity); }
        let product = self.products.get_product(product_id).await?.ok_or(CartError::ProductNotFound(product_id))?;

        let existing = self.carts.line_for_product(scope, product_id).await?;
        let existing_qty = existing.as_ref().map_or(0, |l| l.quantity);
        check_add(&product, existing_qty, quantity)?;

        match existing {
            Some(mut line) => {
                line.quantity = existing_qty + quantity;
                self.carts.set_quantity(scope, line.id, line.quantity).await?;
                Ok(line)
            }
            None => Ok(self.carts.insert_line(scope, product_id, quantity).await?),
        }
    }

    /// Sets a line to exactly `quantity`; zero or less removes it.
    #[instrument(skip(self))]
    pub async fn update_quantity(&self, scope: &CartScope, line_id: Uuid, quantity: i32) -> Result<(), CartError> {
        if quantity <= 0 { return self.remove(scope, line_id).await; }

        let line = self.carts.owned_line(scope, line_id).await?.ok_or(CartError::LineNotFound(line_id))?;
        let product = self.products.get_product(line.product_id).await?.ok_or(CartError::ProductNotFound(line.product_id))?;
        check_set(&product, quantity)?;

        self.carts.set_quantity(scope, line_id, quantity).await?;
        Ok(())
    }

    /// Deletes the line if the scope owns it. Missing lines are not an error.
    #[instrument(skip(self))]
    pub async fn remove(&self, scope: &CartScope, line_id: Uuid) -> Result<(), CartError> {
        if !self.carts.delete_line(scope, line_id).await? {
            info!(%line_id, "remove of unknown cart line ignored");
        }
        Ok(())
    }

    /// Folds the guest cart into the user's cart and empties the guest cart.
    #[instrument(skip(self))]
    pub async fn merge(&self, guest: &GuestToken, user: UserId) -> Result<MergeOutcome, CartError> {
        let guest_lines = self.carts.lines(&CartScope::Guest(guest.clone())).await?;
        if guest_lines.is_empty() { return Ok(MergeOutcome::default()); }

        let user_lines = self.carts.lines(&CartScope::User(user)).await?;
        let plan = MergePlan::build(guest, &guest_lines, &user_lines);
        if plan.is_empty() { return Ok(MergeOutcome::default()); }

        self.carts.apply_merge(user, &plan).await?;
        let outcome = plan.outcome();
        info!(%user, migrated = outcome.migrated_count, merged = outcome.merged_count, "guest cart merged");

        self.events
            .publish(DomainEvent::Cart(CartEvent::Merged {
                user_id: user,
                guest_token: guest.clone(),
                migrated_count: outcome.migrated_count,
                merged_count: outcome.merged_count,
            }))
            .await;
        Ok(outcome)
    }

    /// Merge run on an auth transition. Never fails: a failed merge drops the
    /// guest cart from view and is only logged.
    pub async fn merge_after_login(&self, guest: &GuestToken, user: UserId) -> MergeOutcome {
        match self.merge(guest, user).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(%user, error = %err, "guest cart migration failed");
                MergeOutcome::default()
            }
        }
    }
}
