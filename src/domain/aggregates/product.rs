//! Product read model
//!
//! Products are owned by the catalogue; the cart only reads price and stock.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub images: Vec<String>,
}

impl Product {
    pub fn is_in_stock(&self) -> bool { self.stock > 0 }
}
