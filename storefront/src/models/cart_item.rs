// storefront/src/models/cart_item.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::line_amount;
use crate::errors::Result;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CartItem {
  pub id: Uuid,
  pub cart_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
}

impl CartItem {
  pub fn new(cart_id: Uuid, product_id: Uuid, quantity: i32) -> Self {
    Self {
      id: Uuid::new_v4(),
      cart_id,
      product_id,
      quantity,
    }
  }
}

/// A cart item joined with the product's current price.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartLine {
  #[sqlx(flatten)]
  #[serde(flatten)]
  pub item: CartItem,
  pub price_cents: i64,
}

impl CartLine {
  pub fn price(&self) -> i64 {
    self.price_cents
  }

  pub fn line_total(&self) -> Result<i64> {
    line_amount(self.price_cents, self.item.quantity)
  }
}
