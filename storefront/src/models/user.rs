// storefront/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use super::order::{Order, OrderStatus};
use super::required_str;
use crate::errors::Result;
use crate::services::auth_service;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
  pub id: Uuid,
  pub username: String,
  pub email: String,
  #[serde(skip_serializing)] // Never send password hash to client
  pub password_hash: String,
  pub created_at: DateTime<Utc>,
}

/// Public representation of a user together with their orders.
#[derive(Debug, Clone, Serialize)]
pub struct UserExport {
  pub self_url: String,
  pub username: String,
  pub email: String,
  pub orders_url: String,
  pub orders: Vec<OrderSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
  pub id: Uuid,
  pub status: OrderStatus,
  pub total_amount_cents: i64,
  pub created_at: DateTime<Utc>,
}

impl User {
  /// A fresh user with no password set yet.
  pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
    Self {
      id: Uuid::new_v4(),
      username: username.into(),
      email: email.into(),
      password_hash: String::new(),
      created_at: Utc::now(),
    }
  }

  pub fn set_password(&mut self, password: &str) -> Result<()> {
    self.password_hash = auth_service::hash_password(password)?;
    Ok(())
  }

  pub fn check_password(&self, password: &str) -> Result<bool> {
    auth_service::verify_password(&self.password_hash, password)
  }

  pub fn url(&self, base_url: &str) -> String {
    format!("{}/users/{}", base_url, self.id)
  }

  pub fn export_data(&self, base_url: &str, orders: &[Order]) -> UserExport {
    UserExport {
      self_url: self.url(base_url),
      username: self.username.clone(),
      email: self.email.clone(),
      orders_url: format!("{}/orders", self.url(base_url)),
      orders: orders
        .iter()
        .map(|order| OrderSummary {
          id: order.id,
          status: order.status,
          total_amount_cents: order.total_amount_cents,
          created_at: order.created_at,
        })
        .collect(),
    }
  }

  /// Overwrites `username` and `email` from a JSON object. Both fields are required; on failure the
  /// user is left untouched.
  pub fn import_data(&mut self, data: &Value) -> Result<&mut Self> {
    let username = required_str(data, "username", "customer")?;
    let email = required_str(data, "email", "customer")?;
    self.username = username;
    self.email = email;
    Ok(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::errors::AppError;
  use serde_json::json;

  #[test]
  fn password_is_hashed_and_verifiable() {
    let mut user = User::new("ada", "ada@example.com");
    user.set_password("correct horse").unwrap();
    assert_ne!(user.password_hash, "correct horse");
    assert!(user.password_hash.starts_with("$argon2"));
    assert!(user.check_password("correct horse").unwrap());
    assert!(!user.check_password("wrong horse").unwrap());
  }

  #[test]
  fn password_hash_is_not_serialized() {
    let mut user = User::new("ada", "ada@example.com");
    user.set_password("correct horse").unwrap();
    let value = serde_json::to_value(&user).unwrap();
    assert!(value.get("password_hash").is_none());
    assert_eq!(value["username"], "ada");
  }

  #[test]
  fn export_links_and_orders() {
    let user = User::new("ada", "ada@example.com");
    let mut order = Order::new(user.id);
    order.total_amount_cents = 1250;
    let export = user.export_data("http://shop", &[order.clone()]);

    assert_eq!(export.self_url, format!("http://shop/users/{}", user.id));
    assert_eq!(export.orders_url, format!("http://shop/users/{}/orders", user.id));
    assert_eq!(export.orders.len(), 1);
    assert_eq!(export.orders[0].id, order.id);
    assert_eq!(export.orders[0].total_amount_cents, 1250);
    assert_eq!(export.orders[0].status, OrderStatus::Pending);
  }

  #[test]
  fn import_requires_username_and_email() {
    let mut user = User::new("ada", "ada@example.com");

    let err = user.import_data(&json!({ "email": "new@example.com" })).unwrap_err();
    match err {
      AppError::Validation(m) => assert_eq!(m, "Invalid customer: missing username"),
      other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(user.email, "ada@example.com");

    let err = user.import_data(&json!({ "username": "lovelace" })).unwrap_err();
    assert!(matches!(err, AppError::Validation(m) if m == "Invalid customer: missing email"));

    user
      .import_data(&json!({ "username": "lovelace", "email": "new@example.com" }))
      .unwrap();
    assert_eq!(user.username, "lovelace");
    assert_eq!(user.email, "new@example.com");
  }
}
