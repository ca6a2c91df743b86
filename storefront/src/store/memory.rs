// storefront/src/store/memory.rs

//! In-memory `Store`. All tables sit behind one mutex. Single-row operations validate first and
//! then write in place; operations spanning several rows run against a copy of the tables that
//! replaces the live ones only when the operation succeeds.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{order_not_found, product_not_found, user_not_found, Store, EMPTY_CART};
use crate::errors::{AppError, Result};
use crate::models::{
  Cart, CartContents, CartItem, CartLine, Checkout, CheckoutReceipt, NewProduct, Order, OrderItem, OrderStatus,
  Product, StockAdjustment, User,
};
use crate::models::add_amount;
use crate::models::product::ensure_positive;
use crate::services::auth_service::{EMAIL_TAKEN, USERNAME_TAKEN};

#[derive(Debug, Clone, Default)]
struct Tables {
  users: HashMap<Uuid, User>,
  products: HashMap<Uuid, Product>,
  orders: HashMap<Uuid, Order>,
  order_items: Vec<OrderItem>,
  carts: HashMap<Uuid, Cart>,
  cart_items: Vec<CartItem>,
  checkouts: Vec<Checkout>,
}

impl Tables {
  fn product_mut(&mut self, product_id: Uuid) -> Result<&mut Product> {
    self.products.get_mut(&product_id).ok_or_else(|| product_not_found(product_id))
  }

  fn order_mut(&mut self, order_id: Uuid) -> Result<&mut Order> {
    self.orders.get_mut(&order_id).ok_or_else(|| order_not_found(order_id))
  }

  fn cart_id_for(&mut self, user_id: Uuid) -> Result<Uuid> {
    if let Some(cart) = self.carts.values().find(|c| c.user_id == user_id) {
      return Ok(cart.id);
    }
    if !self.users.contains_key(&user_id) {
      return Err(user_not_found(user_id));
    }
    let cart = Cart::new(user_id);
    let id = cart.id;
    self.carts.insert(id, cart);
    Ok(id)
  }

  fn cart_contents(&self, cart_id: Uuid) -> Result<CartContents> {
    let cart = self
      .carts
      .get(&cart_id)
      .cloned()
      .ok_or_else(|| AppError::NotFound(format!("Cart with ID {} not found.", cart_id)))?;
    let items = self
      .cart_items
      .iter()
      .filter(|item| item.cart_id == cart_id)
      .map(|item| -> Result<CartLine> {
        let price_cents = self
          .products
          .get(&item.product_id)
          .map(|p| p.price_cents)
          .ok_or_else(|| product_not_found(item.product_id))?;
        Ok(CartLine {
          item: item.clone(),
          price_cents,
        })
      })
      .collect::<Result<Vec<_>>>()?;
    Ok(CartContents { cart, items })
  }

  /// Every check runs before stock or the order total is touched.
  fn add_order_item(&mut self, order_id: Uuid, product_id: Uuid, quantity: i32) -> Result<OrderItem> {
    let total_cents = self.order_mut(order_id)?.total_amount_cents;
    let product = self.product_mut(product_id)?;
    let item = OrderItem::new(order_id, product_id, quantity, product.price_cents);
    let new_total = add_amount(total_cents, item.total_price()?)?;
    product.reduce_quantity(quantity)?;
    self.order_mut(order_id)?.total_amount_cents = new_total;
    self.order_items.push(item.clone());
    Ok(item)
  }

  fn restore_stock(&mut self, item: &OrderItem) -> Result<()> {
    self.product_mut(item.product_id)?.increase_quantity(item.quantity)
  }

  fn cancel_order(&mut self, order_id: Uuid) -> Result<()> {
    self.order_mut(order_id)?;
    let items: Vec<OrderItem> = self
      .order_items
      .iter()
      .filter(|item| item.order_id == order_id)
      .cloned()
      .collect();
    for item in &items {
      self.restore_stock(item)?;
    }
    self.order_items.retain(|item| item.order_id != order_id);
    self.checkouts.retain(|c| c.order_id != order_id);
    self.orders.remove(&order_id);
    Ok(())
  }
}

fn sorted_by_creation<T>(rows: impl Iterator<Item = T>, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
  let mut rows: Vec<T> = rows.collect();
  rows.sort_by_key(|row| created_at(row));
  rows
}

#[derive(Debug, Default)]
pub struct MemoryStore {
  tables: Mutex<Tables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
    f(&self.tables.lock())
  }

  /// Applies `f` to the live tables. `f` must finish all of its checks before its first write.
  fn write<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
    f(&mut self.tables.lock())
  }

  /// Applies `f` to a scratch copy of the tables and keeps the result only on success.
  fn transact<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
    let mut tables = self.tables.lock();
    let mut scratch = (*tables).clone();
    let out = f(&mut scratch)?;
    *tables = scratch;
    Ok(out)
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn insert_user(&self, user: User) -> Result<User> {
    self.write(|t| {
      if t.users.values().any(|u| u.email == user.email) {
        return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
      }
      if t.users.values().any(|u| u.username == user.username) {
        return Err(AppError::Conflict(USERNAME_TAKEN.to_string()));
      }
      t.users.insert(user.id, user.clone());
      Ok(user)
    })
  }

  async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
    Ok(self.read(|t| t.users.get(&user_id).cloned()))
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    Ok(self.read(|t| t.users.values().find(|u| u.email == email).cloned()))
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    Ok(self.read(|t| sorted_by_creation(t.users.values().cloned(), |u| u.created_at)))
  }

  async fn update_user(&self, user: &User) -> Result<User> {
    self.write(|t| {
      if t.users.values().any(|u| u.id != user.id && u.email == user.email) {
        return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
      }
      if t.users.values().any(|u| u.id != user.id && u.username == user.username) {
        return Err(AppError::Conflict(USERNAME_TAKEN.to_string()));
      }
      let stored = t.users.get_mut(&user.id).ok_or_else(|| user_not_found(user.id))?;
      stored.username = user.username.clone();
      stored.email = user.email.clone();
      Ok(stored.clone())
    })
  }

  #[instrument(name = "memory_store::delete_user", skip(self))]
  async fn delete_user(&self, user_id: Uuid) -> Result<()> {
    self.transact(|t| {
      t.users.remove(&user_id).ok_or_else(|| user_not_found(user_id))?;
      let order_ids: Vec<Uuid> = t.orders.values().filter(|o| o.user_id == user_id).map(|o| o.id).collect();
      for order_id in order_ids {
        t.cancel_order(order_id)?;
      }
      t.checkouts.retain(|c| c.user_id != user_id);
      let cart_ids: Vec<Uuid> = t.carts.values().filter(|c| c.user_id == user_id).map(|c| c.id).collect();
      t.cart_items.retain(|item| !cart_ids.contains(&item.cart_id));
      t.carts.retain(|_, c| c.user_id != user_id);
      Ok(())
    })
  }

  async fn insert_product(&self, product: NewProduct) -> Result<Product> {
    let product = Product::new(product)?;
    self.write(|t| {
      t.products.insert(product.id, product.clone());
      Ok(product)
    })
  }

  async fn find_product(&self, product_id: Uuid) -> Result<Option<Product>> {
    Ok(self.read(|t| t.products.get(&product_id).cloned()))
  }

  async fn list_products(&self) -> Result<Vec<Product>> {
    Ok(self.read(|t| {
      let mut products: Vec<Product> = t.products.values().cloned().collect();
      products.sort_by(|a, b| a.name.cmp(&b.name));
      products
    }))
  }

  async fn update_product(&self, product: &Product) -> Result<Product> {
    self.write(|t| {
      let stored = t.product_mut(product.id)?;
      stored.name = product.name.clone();
      stored.price_cents = product.price_cents;
      stored.description = product.description.clone();
      Ok(stored.clone())
    })
  }

  async fn adjust_stock(&self, product_id: Uuid, adjustment: StockAdjustment) -> Result<Product> {
    self.write(|t| {
      let product = t.product_mut(product_id)?;
      product.apply(adjustment)?;
      Ok(product.clone())
    })
  }

  async fn order_items_for_product(&self, product_id: Uuid) -> Result<Vec<OrderItem>> {
    Ok(self.read(|t| {
      t.order_items
        .iter()
        .filter(|item| item.product_id == product_id)
        .cloned()
        .collect()
    }))
  }

  async fn create_order(&self, user_id: Uuid) -> Result<Order> {
    self.write(|t| {
      if !t.users.contains_key(&user_id) {
        return Err(user_not_found(user_id));
      }
      let order = Order::new(user_id);
      t.orders.insert(order.id, order.clone());
      Ok(order)
    })
  }

  async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>> {
    Ok(self.read(|t| t.orders.get(&order_id).cloned()))
  }

  async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
    Ok(self.read(|t| {
      t.order_items
        .iter()
        .filter(|item| item.order_id == order_id)
        .cloned()
        .collect()
    }))
  }

  async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
    Ok(self.read(|t| {
      sorted_by_creation(
        t.orders.values().filter(|o| o.user_id == user_id).cloned(),
        |o| o.created_at,
      )
    }))
  }

  async fn update_order_status(&self, order_id: Uuid, status: OrderStatus) -> Result<Order> {
    self.write(|t| {
      let order = t.order_mut(order_id)?;
      order.update_status(status);
      Ok(order.clone())
    })
  }

  #[instrument(name = "memory_store::add_order_item", skip(self))]
  async fn add_order_item(&self, order_id: Uuid, product_id: Uuid, quantity: i32) -> Result<OrderItem> {
    self.write(|t| t.add_order_item(order_id, product_id, quantity))
  }

  #[instrument(name = "memory_store::cancel_order_item", skip(self))]
  async fn cancel_order_item(&self, item_id: Uuid) -> Result<()> {
    self.transact(|t| {
      let position = t
        .order_items
        .iter()
        .position(|item| item.id == item_id)
        .ok_or_else(|| AppError::NotFound(format!("Order item with ID {} not found.", item_id)))?;
      let item = t.order_items.remove(position);
      t.restore_stock(&item)?;
      let amount = item.total_price()?;
      t.order_mut(item.order_id)?.total_amount_cents -= amount;
      Ok(())
    })
  }

  #[instrument(name = "memory_store::cancel_order", skip(self))]
  async fn cancel_order(&self, order_id: Uuid) -> Result<()> {
    self.transact(|t| t.cancel_order(order_id))
  }

  async fn cart_for_user(&self, user_id: Uuid) -> Result<CartContents> {
    self.write(|t| {
      let cart_id = t.cart_id_for(user_id)?;
      t.cart_contents(cart_id)
    })
  }

  async fn add_cart_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartItem> {
    ensure_positive(quantity)?;
    self.write(|t| {
      let stock = t.product_mut(product_id)?.quantity;
      let existing = t
        .carts
        .values()
        .find(|c| c.user_id == user_id)
        .and_then(|cart| {
          t.cart_items
            .iter()
            .position(|item| item.cart_id == cart.id && item.product_id == product_id)
        });
      let wanted = existing
        .map_or(0, |i| t.cart_items[i].quantity)
        .checked_add(quantity)
        .filter(|wanted| *wanted <= stock)
        .ok_or_else(|| AppError::Validation(format!("Insufficient stock. Only {} available.", stock)))?;
      let cart_id = t.cart_id_for(user_id)?;
      match existing {
        Some(i) => {
          t.cart_items[i].quantity = wanted;
          Ok(t.cart_items[i].clone())
        }
        None => {
          let item = CartItem::new(cart_id, product_id, quantity);
          t.cart_items.push(item.clone());
          Ok(item)
        }
      }
    })
  }

  async fn update_cart_quantity(&self, cart_id: Uuid, product_id: Uuid, quantity: i32) -> Result<()> {
    ensure_positive(quantity)?;
    self.write(|t| {
      if let Some(item) = t
        .cart_items
        .iter_mut()
        .find(|item| item.cart_id == cart_id && item.product_id == product_id)
      {
        item.quantity = quantity;
      }
      Ok(())
    })
  }

  async fn remove_cart_item(&self, cart_id: Uuid, product_id: Uuid) -> Result<()> {
    self.write(|t| {
      t.cart_items
        .retain(|item| !(item.cart_id == cart_id && item.product_id == product_id));
      Ok(())
    })
  }

  #[instrument(name = "memory_store::checkout", skip(self))]
  async fn checkout(&self, user_id: Uuid) -> Result<CheckoutReceipt> {
    self.transact(|t| {
      if !t.users.contains_key(&user_id) {
        return Err(user_not_found(user_id));
      }
      let cart_id = t.cart_id_for(user_id)?;
      let contents = t.cart_contents(cart_id)?;
      if contents.is_empty() {
        return Err(AppError::Validation(EMPTY_CART.to_string()));
      }

      let order = Order::new(user_id);
      t.orders.insert(order.id, order.clone());
      let items = contents
        .items
        .iter()
        .map(|line| t.add_order_item(order.id, line.item.product_id, line.item.quantity))
        .collect::<Result<Vec<_>>>()?;

      t.cart_items.retain(|item| item.cart_id != cart_id);
      let checkout = Checkout::new(user_id, order.id);
      t.checkouts.push(checkout.clone());
      let order = t.order_mut(order.id)?.clone();
      debug!(order_id = %order.id, lines = items.len(), "Cart checked out.");

      Ok(CheckoutReceipt { checkout, order, items })
    })
  }

  async fn checkouts_for_user(&self, user_id: Uuid) -> Result<Vec<Checkout>> {
    Ok(self.read(|t| {
      sorted_by_creation(
        t.checkouts.iter().filter(|c| c.user_id == user_id).cloned(),
        |c| c.checkout_date,
      )
    }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::product::INSUFFICIENT_STOCK;

  async fn seeded() -> (MemoryStore, User, Product) {
    let store = MemoryStore::new();
    let user = store.insert_user(User::new("ada", "ada@example.com")).await.unwrap();
    let product = store
      .insert_product(NewProduct {
        name: "Widget".to_string(),
        price_cents: 500,
        description: None,
        quantity: 10,
      })
      .await
      .unwrap();
    (store, user, product)
  }

  async fn stock_of(store: &MemoryStore, product_id: Uuid) -> i32 {
    store.find_product(product_id).await.unwrap().unwrap().quantity
  }

  #[tokio::test]
  async fn failed_operation_leaves_tables_untouched() {
    let (store, user, product) = seeded().await;
    let order = store.create_order(user.id).await.unwrap();

    let err = store.add_order_item(order.id, product.id, 11).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(m) if m == INSUFFICIENT_STOCK));
    assert_eq!(stock_of(&store, product.id).await, 10);
    assert!(store.order_items(order.id).await.unwrap().is_empty());
    assert_eq!(store.find_order(order.id).await.unwrap().unwrap().total_amount_cents, 0);
  }

  #[tokio::test]
  async fn cancel_item_restores_stock_and_total() {
    let (store, user, product) = seeded().await;
    let order = store.create_order(user.id).await.unwrap();
    let keep = store.add_order_item(order.id, product.id, 2).await.unwrap();
    let dropped = store.add_order_item(order.id, product.id, 3).await.unwrap();
    assert_eq!(stock_of(&store, product.id).await, 5);

    store.cancel_order_item(dropped.id).await.unwrap();
    assert_eq!(stock_of(&store, product.id).await, 8);
    let order = store.find_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.total_amount_cents, keep.total_price().unwrap());
  }

  #[tokio::test]
  async fn delete_user_releases_their_stock() {
    let (store, user, product) = seeded().await;
    let order = store.create_order(user.id).await.unwrap();
    store.add_order_item(order.id, product.id, 4).await.unwrap();
    store.add_cart_item(user.id, product.id, 1).await.unwrap();

    store.delete_user(user.id).await.unwrap();
    assert_eq!(stock_of(&store, product.id).await, 10);
    assert!(store.find_order(order.id).await.unwrap().is_none());
    assert!(store.find_user(user.id).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn duplicate_username_is_a_conflict() {
    let (store, _, _) = seeded().await;
    let err = store
      .insert_user(User::new("ada", "other@example.com"))
      .await
      .unwrap_err();
    assert!(matches!(err, AppError::Conflict(m) if m == USERNAME_TAKEN));
  }

  #[tokio::test]
  async fn update_cart_quantity_ignores_missing_line() {
    let (store, user, product) = seeded().await;
    let cart = store.cart_for_user(user.id).await.unwrap();
    store.update_cart_quantity(cart.cart.id, product.id, 3).await.unwrap();
    assert!(store.cart_for_user(user.id).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn unknown_user_has_no_cart() {
    let (store, _, product) = seeded().await;
    let stranger = Uuid::new_v4();
    assert!(matches!(store.cart_for_user(stranger).await, Err(AppError::NotFound(_))));
    assert!(matches!(
      store.add_cart_item(stranger, product.id, 1).await,
      Err(AppError::NotFound(_))
    ));
  }

  #[tokio::test]
  async fn cart_line_quantity_cannot_overflow() {
    let (store, user, product) = seeded().await;
    store.add_cart_item(user.id, product.id, 5).await.unwrap();

    let err = store.add_cart_item(user.id, product.id, i32::MAX).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(m) if m.starts_with("Insufficient stock")));
    let cart = store.cart_for_user(user.id).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].item.quantity, 5);
  }

  #[tokio::test]
  async fn oversized_order_amount_is_rejected_before_taking_stock() {
    let (store, user, _) = seeded().await;
    let gold = store
      .insert_product(NewProduct {
        name: "Gold".to_string(),
        price_cents: i64::MAX / 2,
        description: None,
        quantity: 10,
      })
      .await
      .unwrap();
    let order = store.create_order(user.id).await.unwrap();

    let err = store.add_order_item(order.id, gold.id, 3).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(m) if m == crate::models::AMOUNT_OVERFLOW));
    assert_eq!(stock_of(&store, gold.id).await, 10);
    assert!(store.order_items(order.id).await.unwrap().is_empty());

    store.add_order_item(order.id, gold.id, 1).await.unwrap();
    let err = store.add_order_item(order.id, gold.id, 2).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(stock_of(&store, gold.id).await, 9);
    let order = store.find_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.total_amount_cents, i64::MAX / 2);
  }
}
