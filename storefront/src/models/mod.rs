// storefront/src/models/mod.rs

//! Contains data structures representing database entities.

pub mod cart;
pub mod cart_item;
pub mod checkout;
pub mod order;
pub mod order_item;
pub mod product;
pub mod user;

pub use cart::{Cart, CartContents};
pub use cart_item::{CartItem, CartLine};
pub use checkout::{Checkout, CheckoutReceipt};
pub use order::{Order, OrderDetails, OrderStatus};
pub use order_item::OrderItem;
pub use product::{NewProduct, Product, ProductExport, StockAdjustment};
pub use user::{User, UserExport};

use crate::errors::{AppError, Result};
use serde_json::Value;

pub const AMOUNT_OVERFLOW: &str = "Amount exceeds the supported range.";

/// Reads a required string field for `import_data`, reporting the offending field by name.
pub(crate) fn required_str(data: &Value, field: &str, entity: &str) -> Result<String> {
  match data.get(field) {
    Some(Value::String(s)) => Ok(s.clone()),
    None | Some(Value::Null) => Err(AppError::Validation(format!("Invalid {}: missing {}", entity, field))),
    Some(_) => Err(AppError::Validation(format!(
      "Invalid {}: {} must be a string",
      entity, field
    ))),
  }
}

/// `price_cents * quantity`, rejected instead of wrapping.
pub(crate) fn line_amount(price_cents: i64, quantity: i32) -> Result<i64> {
  price_cents
    .checked_mul(i64::from(quantity))
    .ok_or_else(|| AppError::Validation(AMOUNT_OVERFLOW.to_string()))
}

pub(crate) fn add_amount(total_cents: i64, amount_cents: i64) -> Result<i64> {
  total_cents
    .checked_add(amount_cents)
    .ok_or_else(|| AppError::Validation(AMOUNT_OVERFLOW.to_string()))
}
