// storefront/src/store/mod.rs

//! Persistence boundary. Every mutating operation is applied atomically: either all of its row
//! changes land or none do.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{
  CartContents, CartItem, Checkout, CheckoutReceipt, NewProduct, Order, OrderItem, OrderStatus, Product,
  StockAdjustment, User,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
  // --- Users ---

  /// Fails with `Conflict` when the email or username is already taken.
  async fn insert_user(&self, user: User) -> Result<User>;
  async fn find_user(&self, user_id: Uuid) -> Result<Option<User>>;
  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
  async fn list_users(&self) -> Result<Vec<User>>;
  /// Persists `username` and `email` of an existing user.
  async fn update_user(&self, user: &User) -> Result<User>;
  /// Removes the user with their cart, checkouts and orders. Stock held by their orders is
  /// restored first.
  async fn delete_user(&self, user_id: Uuid) -> Result<()>;

  // --- Products ---

  async fn insert_product(&self, product: NewProduct) -> Result<Product>;
  async fn find_product(&self, product_id: Uuid) -> Result<Option<Product>>;
  async fn list_products(&self) -> Result<Vec<Product>>;
  /// Persists `name`, `price_cents` and `description`. Stock only changes through
  /// `adjust_stock` and the order operations.
  async fn update_product(&self, product: &Product) -> Result<Product>;
  async fn adjust_stock(&self, product_id: Uuid, adjustment: StockAdjustment) -> Result<Product>;
  async fn order_items_for_product(&self, product_id: Uuid) -> Result<Vec<OrderItem>>;

  // --- Orders ---

  async fn create_order(&self, user_id: Uuid) -> Result<Order>;
  async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>>;
  async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>>;
  async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>>;
  async fn update_order_status(&self, order_id: Uuid, status: OrderStatus) -> Result<Order>;
  /// Checks stock, takes `quantity` out of it and records the item at the current price.
  async fn add_order_item(&self, order_id: Uuid, product_id: Uuid, quantity: i32) -> Result<OrderItem>;
  /// Returns the item's quantity to stock and deletes it.
  async fn cancel_order_item(&self, item_id: Uuid) -> Result<()>;
  /// Returns every item's quantity to stock, then deletes the order, its items and its checkout.
  async fn cancel_order(&self, order_id: Uuid) -> Result<()>;

  // --- Cart ---

  /// The user's cart, created empty on first access.
  async fn cart_for_user(&self, user_id: Uuid) -> Result<CartContents>;
  /// Adds to the line for `product_id`, creating it if needed. The resulting line quantity may not
  /// exceed current stock; stock itself is not reserved.
  async fn add_cart_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartItem>;
  /// Sets the quantity of an existing line; a missing line is left alone.
  async fn update_cart_quantity(&self, cart_id: Uuid, product_id: Uuid, quantity: i32) -> Result<()>;
  /// Deletes a line if present.
  async fn remove_cart_item(&self, cart_id: Uuid, product_id: Uuid) -> Result<()>;

  // --- Checkout ---

  /// Turns the user's cart into a Pending order, reserving stock for every line, empties the cart
  /// and records the checkout. Any shortfall aborts the whole operation.
  async fn checkout(&self, user_id: Uuid) -> Result<CheckoutReceipt>;
  async fn checkouts_for_user(&self, user_id: Uuid) -> Result<Vec<Checkout>>;
}

pub(crate) fn product_not_found(product_id: Uuid) -> AppError {
  AppError::NotFound(format!("Product with ID {} not found.", product_id))
}

pub(crate) fn order_not_found(order_id: Uuid) -> AppError {
  AppError::NotFound(format!("Order with ID {} not found.", order_id))
}

pub(crate) fn user_not_found(user_id: Uuid) -> AppError {
  AppError::NotFound(format!("User with ID {} not found.", user_id))
}

pub(crate) const EMPTY_CART: &str = "Cannot check out an empty cart.";
