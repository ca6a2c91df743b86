// storefront/src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

use super::add_amount;
use super::order_item::OrderItem;
use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
pub enum OrderStatus {
  #[default]
  Pending,
  Paid,
  Shipped,
  Delivered,
  Completed,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub status: OrderStatus,
  /// Running sum of the order's item totals.
  pub total_amount_cents: i64,
  pub created_at: DateTime<Utc>,
}

impl Order {
  pub fn new(user_id: Uuid) -> Self {
    Self {
      id: Uuid::new_v4(),
      user_id,
      status: OrderStatus::Pending,
      total_amount_cents: 0,
      created_at: Utc::now(),
    }
  }

  /// Sum of price × quantity over `items`, which must belong to this order.
  pub fn total_price(&self, items: &[OrderItem]) -> Result<i64> {
    items
      .iter()
      .filter(|item| item.order_id == self.id)
      .try_fold(0, |total, item| add_amount(total, item.total_price()?))
  }

  pub fn update_status(&mut self, new_status: OrderStatus) {
    self.status = new_status;
  }
}

/// An order together with its line items, as returned by the order endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
  pub order: Order,
  pub items: Vec<OrderItem>,
  pub computed_total_cents: i64,
}

impl OrderDetails {
  pub fn new(order: Order, items: Vec<OrderItem>) -> Result<Self> {
    let computed_total_cents = order.total_price(&items)?;
    Ok(Self {
      order,
      items,
      computed_total_cents,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn total_price_sums_own_items() {
    let order = Order::new(Uuid::new_v4());
    let items = vec![
      OrderItem::new(order.id, Uuid::new_v4(), 2, 300),
      OrderItem::new(order.id, Uuid::new_v4(), 1, 1000),
      OrderItem::new(Uuid::new_v4(), Uuid::new_v4(), 9, 9999),
    ];
    assert_eq!(order.total_price(&items).unwrap(), 1600);
    assert_eq!(order.total_price(&[]).unwrap(), 0);
  }

  #[test]
  fn status_defaults_to_pending_and_updates() {
    let mut order = Order::new(Uuid::new_v4());
    assert_eq!(order.status, OrderStatus::Pending);
    order.update_status(OrderStatus::Shipped);
    assert_eq!(order.status, OrderStatus::Shipped);
  }

  #[test]
  fn status_serializes_capitalized() {
    assert_eq!(serde_json::to_value(OrderStatus::Pending).unwrap(), "Pending");
    let s: OrderStatus = serde_json::from_value(serde_json::json!("Delivered")).unwrap();
    assert_eq!(s, OrderStatus::Delivered);
  }
}
