// storefront/src/models/product.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use super::required_str;
use crate::errors::{AppError, Result};

pub const INSUFFICIENT_STOCK: &str = "Insufficient quantity in stock.";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub price_cents: i64,
  pub description: Option<String>,
  /// Units in stock, never negative.
  pub quantity: i32,
  pub created_at: DateTime<Utc>,
}

/// Payload for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
  pub name: String,
  pub price_cents: i64,
  #[serde(default)]
  pub description: Option<String>,
  pub quantity: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductExport {
  pub self_url: String,
  pub name: String,
  pub price_cents: i64,
  pub description: Option<String>,
  pub quantity: i32,
  pub created_at: DateTime<Utc>,
  pub order_items_url: String,
}

/// A stock movement requested through the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockAdjustment {
  Reduce(i32),
  Increase(i32),
}

impl Product {
  pub fn new(input: NewProduct) -> Result<Self> {
    if input.name.trim().is_empty() {
      return Err(AppError::Validation("Product name cannot be empty.".to_string()));
    }
    if input.price_cents < 0 {
      return Err(AppError::Validation("Product price cannot be negative.".to_string()));
    }
    if input.quantity < 0 {
      return Err(AppError::Validation("Product quantity cannot be negative.".to_string()));
    }
    Ok(Self {
      id: Uuid::new_v4(),
      name: input.name,
      price_cents: input.price_cents,
      description: input.description,
      quantity: input.quantity,
      created_at: Utc::now(),
    })
  }

  pub fn has_stock_for(&self, quantity: i32) -> bool {
    self.quantity >= quantity
  }

  /// Takes `quantity` units out of stock. Fails without touching stock when fewer are available.
  pub fn reduce_quantity(&mut self, quantity: i32) -> Result<()> {
    ensure_positive(quantity)?;
    if !self.has_stock_for(quantity) {
      return Err(AppError::Validation(INSUFFICIENT_STOCK.to_string()));
    }
    self.quantity -= quantity;
    Ok(())
  }

  pub fn increase_quantity(&mut self, quantity: i32) -> Result<()> {
    ensure_positive(quantity)?;
    self.quantity = self
      .quantity
      .checked_add(quantity)
      .ok_or_else(|| AppError::Validation("Stock quantity overflow.".to_string()))?;
    Ok(())
  }

  pub fn apply(&mut self, adjustment: StockAdjustment) -> Result<()> {
    match adjustment {
      StockAdjustment::Reduce(n) => self.reduce_quantity(n),
      StockAdjustment::Increase(n) => self.increase_quantity(n),
    }
  }

  pub fn url(&self, base_url: &str) -> String {
    format!("{}/products/{}", base_url, self.id)
  }

  pub fn export_data(&self, base_url: &str) -> ProductExport {
    ProductExport {
      self_url: self.url(base_url),
      name: self.name.clone(),
      price_cents: self.price_cents,
      description: self.description.clone(),
      quantity: self.quantity,
      created_at: self.created_at,
      order_items_url: format!("{}/order-items", self.url(base_url)),
    }
  }

  /// `name` is required; `price_cents` and `description` are applied when present.
  pub fn import_data(&mut self, data: &Value) -> Result<&mut Self> {
    let name = required_str(data, "name", "product")?;
    let price_cents = match data.get("price_cents") {
      None | Some(Value::Null) => None,
      Some(v) => Some(
        v.as_i64()
          .filter(|p| *p >= 0)
          .ok_or_else(|| AppError::Validation("Invalid product: price_cents must be a non-negative integer".to_string()))?,
      ),
    };

    self.name = name;
    if let Some(price_cents) = price_cents {
      self.price_cents = price_cents;
    }
    if let Some(description) = data.get("description") {
      self.description = description.as_str().map(str::to_string);
    }
    Ok(self)
  }
}

pub(crate) fn ensure_positive(quantity: i32) -> Result<()> {
  if quantity <= 0 {
    return Err(AppError::Validation("Quantity must be a positive number.".to_string()));
  }
  Ok(())
}
