// storefront/src/models/order_item.rs

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::line_amount;
use crate::errors::Result;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub price_at_purchase_cents: i64,
}

impl OrderItem {
  pub fn new(order_id: Uuid, product_id: Uuid, quantity: i32, price_at_purchase_cents: i64) -> Self {
    Self {
      id: Uuid::new_v4(),
      order_id,
      product_id,
      quantity,
      price_at_purchase_cents,
    }
  }

  pub fn total_price(&self) -> Result<i64> {
    line_amount(self.price_at_purchase_cents, self.quantity)
  }
}
