// storefront/src/models/cart.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::add_amount;
use super::cart_item::CartLine;
use crate::errors::Result;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Cart {
  pub id: Uuid,
  pub user_id: Uuid,
  pub created_at: DateTime<Utc>,
}

impl Cart {
  pub fn new(user_id: Uuid) -> Self {
    Self {
      id: Uuid::new_v4(),
      user_id,
      created_at: Utc::now(),
    }
  }
}

/// A cart with its lines priced at current product prices.
#[derive(Debug, Clone, Serialize)]
pub struct CartContents {
  pub cart: Cart,
  pub items: Vec<CartLine>,
}

impl CartContents {
  pub fn calculate_total_cost(&self) -> Result<i64> {
    self
      .items
      .iter()
      .try_fold(0, |total, line| add_amount(total, line.line_total()?))
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}
