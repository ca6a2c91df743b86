// storefront/src/models/checkout.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::{Order, OrderItem};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Checkout {
  pub id: Uuid,
  pub user_id: Uuid,
  pub order_id: Uuid,
  pub checkout_date: DateTime<Utc>,
}

impl Checkout {
  pub fn new(user_id: Uuid, order_id: Uuid) -> Self {
    Self {
      id: Uuid::new_v4(),
      user_id,
      order_id,
      checkout_date: Utc::now(),
    }
  }
}

/// Everything a successful checkout produced.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
  pub checkout: Checkout,
  pub order: Order,
  pub items: Vec<OrderItem>,
}
