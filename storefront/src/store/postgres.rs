// storefront/src/store/postgres.rs

//! PostgreSQL `Store` over a sqlx pool. Each mutating operation runs in its own transaction; rows
//! whose stock is checked are locked with `FOR UPDATE` first so concurrent reductions serialize.

use async_trait::async_trait;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{order_not_found, product_not_found, user_not_found, Store, EMPTY_CART};
use crate::errors::{AppError, Result};
use crate::models::{
  Cart, CartContents, CartItem, CartLine, Checkout, CheckoutReceipt, NewProduct, Order, OrderItem, OrderStatus,
  Product, StockAdjustment, User,
};
use crate::models::product::ensure_positive;
use crate::models::{add_amount, line_amount};
use crate::services::auth_service::{EMAIL_TAKEN, USERNAME_TAKEN};

const USERNAME_CONSTRAINT: &str = "users_username_key";

#[derive(Debug, Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
    let pool = PgPoolOptions::new()
      .max_connections(max_connections)
      .connect(database_url)
      .await?;
    info!(max_connections, "Connected to PostgreSQL.");
    Ok(Self::new(pool))
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }

  #[instrument(name = "pg_store::migrate", skip(self))]
  pub async fn migrate(&self) -> Result<()> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    info!("Database migrations applied.");
    Ok(())
  }
}

/// Unique violations on `users` name the constraint that fired; anything but the username one is
/// reported as a taken email.
fn user_conflict(err: sqlx::Error) -> AppError {
  let message = match &err {
    sqlx::Error::Database(db_err) if db_err.constraint() == Some(USERNAME_CONSTRAINT) => USERNAME_TAKEN,
    _ => EMAIL_TAKEN,
  };
  AppError::from_unique_violation(err, message)
}

/// A foreign-key violation on `user_id` means the user does not exist.
fn missing_user_or(err: sqlx::Error, user_id: Uuid) -> AppError {
  let missing_user = matches!(&err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation());
  if missing_user {
    user_not_found(user_id)
  } else {
    AppError::Sqlx(err)
  }
}

async fn lock_product(conn: &mut PgConnection, product_id: Uuid) -> Result<Product> {
  sqlx::query_as::<_, Product>(
    "SELECT id, name, price_cents, description, quantity, created_at FROM products WHERE id = $1 FOR UPDATE",
  )
  .bind(product_id)
  .fetch_optional(&mut *conn)
  .await?
  .ok_or_else(|| product_not_found(product_id))
}

async fn store_quantity(conn: &mut PgConnection, product: &Product) -> Result<()> {
  sqlx::query("UPDATE products SET quantity = $2 WHERE id = $1")
    .bind(product.id)
    .bind(product.quantity)
    .execute(&mut *conn)
    .await?;
  Ok(())
}

async fn lock_order(conn: &mut PgConnection, order_id: Uuid) -> Result<Order> {
  sqlx::query_as::<_, Order>(
    "SELECT id, user_id, status, total_amount_cents, created_at FROM orders WHERE id = $1 FOR UPDATE",
  )
  .bind(order_id)
  .fetch_optional(&mut *conn)
  .await?
  .ok_or_else(|| order_not_found(order_id))
}

async fn set_total(conn: &mut PgConnection, order_id: Uuid, total_cents: i64) -> Result<()> {
  sqlx::query("UPDATE orders SET total_amount_cents = $2 WHERE id = $1")
    .bind(order_id)
    .bind(total_cents)
    .execute(&mut *conn)
    .await?;
  Ok(())
}

async fn add_order_item_in(
  conn: &mut PgConnection,
  order_id: Uuid,
  product_id: Uuid,
  quantity: i32,
) -> Result<OrderItem> {
  let order = lock_order(conn, order_id).await?;
  let mut product = lock_product(conn, product_id).await?;
  let new_total = add_amount(order.total_amount_cents, line_amount(product.price_cents, quantity)?)?;
  product.reduce_quantity(quantity)?;
  store_quantity(conn, &product).await?;

  let item = sqlx::query_as::<_, OrderItem>(
    "INSERT INTO order_items (id, order_id, product_id, quantity, price_at_purchase_cents) \
     VALUES ($1, $2, $3, $4, $5) \
     RETURNING id, order_id, product_id, quantity, price_at_purchase_cents",
  )
  .bind(Uuid::new_v4())
  .bind(order_id)
  .bind(product_id)
  .bind(quantity)
  .bind(product.price_cents)
  .fetch_one(&mut *conn)
  .await?;

  set_total(conn, order_id, new_total).await?;
  Ok(item)
}

async fn restore_stock_in(conn: &mut PgConnection, item: &OrderItem) -> Result<()> {
  let mut product = lock_product(conn, item.product_id).await?;
  product.increase_quantity(item.quantity)?;
  store_quantity(conn, &product).await
}

async fn cancel_order_in(conn: &mut PgConnection, order_id: Uuid) -> Result<()> {
  lock_order(conn, order_id).await?;
  let items = sqlx::query_as::<_, OrderItem>(
    "SELECT id, order_id, product_id, quantity, price_at_purchase_cents FROM order_items WHERE order_id = $1",
  )
  .bind(order_id)
  .fetch_all(&mut *conn)
  .await?;

  for item in &items {
    restore_stock_in(conn, item).await?;
  }
  // order_items and checkouts go with it via ON DELETE CASCADE
  sqlx::query("DELETE FROM orders WHERE id = $1")
    .bind(order_id)
    .execute(&mut *conn)
    .await?;
  debug!(%order_id, restored_items = items.len(), "Order cancelled.");
  Ok(())
}

async fn ensure_cart(conn: &mut PgConnection, user_id: Uuid) -> Result<Cart> {
  sqlx::query("INSERT INTO carts (id, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
    .bind(Uuid::new_v4())
    .bind(user_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| missing_user_or(e, user_id))?;
  let cart = sqlx::query_as::<_, Cart>("SELECT id, user_id, created_at FROM carts WHERE user_id = $1")
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;
  Ok(cart)
}

async fn cart_lines(conn: &mut PgConnection, cart_id: Uuid, lock: bool) -> Result<Vec<CartLine>> {
  let sql = if lock {
    "SELECT ci.id, ci.cart_id, ci.product_id, ci.quantity, p.price_cents \
     FROM cart_items ci JOIN products p ON p.id = ci.product_id \
     WHERE ci.cart_id = $1 ORDER BY p.name FOR UPDATE OF ci"
  } else {
    "SELECT ci.id, ci.cart_id, ci.product_id, ci.quantity, p.price_cents \
     FROM cart_items ci JOIN products p ON p.id = ci.product_id \
     WHERE ci.cart_id = $1 ORDER BY p.name"
  };
  let lines = sqlx::query_as::<_, CartLine>(sql)
    .bind(cart_id)
    .fetch_all(&mut *conn)
    .await?;
  Ok(lines)
}

#[async_trait]
impl Store for PgStore {
  #[instrument(name = "pg_store::insert_user", skip(self, user), fields(user_id = %user.id))]
  async fn insert_user(&self, user: User) -> Result<User> {
    sqlx::query_as::<_, User>(
      "INSERT INTO users (id, username, email, password_hash, created_at) VALUES ($1, $2, $3, $4, $5) \
       RETURNING id, username, email, password_hash, created_at",
    )
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.created_at)
    .fetch_one(&self.pool)
    .await
    .map_err(user_conflict)
  }

  async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT id, username, email, password_hash, created_at FROM users WHERE id = $1")
      .bind(user_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(user)
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    let user =
      sqlx::query_as::<_, User>("SELECT id, username, email, password_hash, created_at FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
    Ok(user)
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>(
      "SELECT id, username, email, password_hash, created_at FROM users ORDER BY created_at ASC",
    )
    .fetch_all(&self.pool)
    .await?;
    Ok(users)
  }

  async fn update_user(&self, user: &User) -> Result<User> {
    sqlx::query_as::<_, User>(
      "UPDATE users SET username = $2, email = $3 WHERE id = $1 \
       RETURNING id, username, email, password_hash, created_at",
    )
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.email)
    .fetch_optional(&self.pool)
    .await
    .map_err(user_conflict)?
    .ok_or_else(|| user_not_found(user.id))
  }

  #[instrument(name = "pg_store::delete_user", skip(self))]
  async fn delete_user(&self, user_id: Uuid) -> Result<()> {
    let mut tx = self.pool.begin().await?;
    let order_ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM orders WHERE user_id = $1")
      .bind(user_id)
      .fetch_all(&mut *tx)
      .await?;
    for order_id in order_ids {
      cancel_order_in(&mut tx, order_id).await?;
    }
    let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
      .bind(user_id)
      .execute(&mut *tx)
      .await?
      .rows_affected();
    if deleted == 0 {
      return Err(user_not_found(user_id));
    }
    tx.commit().await?;
    Ok(())
  }

  async fn insert_product(&self, product: NewProduct) -> Result<Product> {
    let product = Product::new(product)?;
    let product = sqlx::query_as::<_, Product>(
      "INSERT INTO products (id, name, price_cents, description, quantity, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6) \
       RETURNING id, name, price_cents, description, quantity, created_at",
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(product.price_cents)
    .bind(&product.description)
    .bind(product.quantity)
    .bind(product.created_at)
    .fetch_one(&self.pool)
    .await?;
    Ok(product)
  }

  async fn find_product(&self, product_id: Uuid) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
      "SELECT id, name, price_cents, description, quantity, created_at FROM products WHERE id = $1",
    )
    .bind(product_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(product)
  }

  async fn list_products(&self) -> Result<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(
      "SELECT id, name, price_cents, description, quantity, created_at FROM products ORDER BY name ASC",
    )
    .fetch_all(&self.pool)
    .await?;
    Ok(products)
  }

  async fn update_product(&self, product: &Product) -> Result<Product> {
    sqlx::query_as::<_, Product>(
      "UPDATE products SET name = $2, price_cents = $3, description = $4 WHERE id = $1 \
       RETURNING id, name, price_cents, description, quantity, created_at",
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(product.price_cents)
    .bind(&product.description)
    .fetch_optional(&self.pool)
    .await?
    .ok_or_else(|| product_not_found(product.id))
  }

  #[instrument(name = "pg_store::adjust_stock", skip(self))]
  async fn adjust_stock(&self, product_id: Uuid, adjustment: StockAdjustment) -> Result<Product> {
    let mut tx = self.pool.begin().await?;
    let mut product = lock_product(&mut tx, product_id).await?;
    product.apply(adjustment)?;
    store_quantity(&mut tx, &product).await?;
    tx.commit().await?;
    Ok(product)
  }

  async fn order_items_for_product(&self, product_id: Uuid) -> Result<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(
      "SELECT id, order_id, product_id, quantity, price_at_purchase_cents FROM order_items WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(items)
  }

  async fn create_order(&self, user_id: Uuid) -> Result<Order> {
    let order = Order::new(user_id);
    sqlx::query_as::<_, Order>(
      "INSERT INTO orders (id, user_id, status, total_amount_cents, created_at) VALUES ($1, $2, $3, $4, $5) \
       RETURNING id, user_id, status, total_amount_cents, created_at",
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(order.status)
    .bind(order.total_amount_cents)
    .bind(order.created_at)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| missing_user_or(e, user_id))
  }

  async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(
      "SELECT id, user_id, status, total_amount_cents, created_at FROM orders WHERE id = $1",
    )
    .bind(order_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(order)
  }

  async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(
      "SELECT id, order_id, product_id, quantity, price_at_purchase_cents FROM order_items WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(items)
  }

  async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
    let orders = sqlx::query_as::<_, Order>(
      "SELECT id, user_id, status, total_amount_cents, created_at FROM orders WHERE user_id = $1 \
       ORDER BY created_at ASC",
    )
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(orders)
  }

  async fn update_order_status(&self, order_id: Uuid, status: OrderStatus) -> Result<Order> {
    sqlx::query_as::<_, Order>(
      "UPDATE orders SET status = $2 WHERE id = $1 \
       RETURNING id, user_id, status, total_amount_cents, created_at",
    )
    .bind(order_id)
    .bind(status)
    .fetch_optional(&self.pool)
    .await?
    .ok_or_else(|| order_not_found(order_id))
  }

  #[instrument(name = "pg_store::add_order_item", skip(self))]
  async fn add_order_item(&self, order_id: Uuid, product_id: Uuid, quantity: i32) -> Result<OrderItem> {
    let mut tx = self.pool.begin().await?;
    let item = add_order_item_in(&mut tx, order_id, product_id, quantity).await?;
    tx.commit().await?;
    Ok(item)
  }

  #[instrument(name = "pg_store::cancel_order_item", skip(self))]
  async fn cancel_order_item(&self, item_id: Uuid) -> Result<()> {
    let mut tx = self.pool.begin().await?;
    let item = sqlx::query_as::<_, OrderItem>(
      "SELECT id, order_id, product_id, quantity, price_at_purchase_cents FROM order_items WHERE id = $1 FOR UPDATE",
    )
    .bind(item_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order item with ID {} not found.", item_id)))?;

    let order = lock_order(&mut tx, item.order_id).await?;
    restore_stock_in(&mut tx, &item).await?;
    sqlx::query("DELETE FROM order_items WHERE id = $1")
      .bind(item_id)
      .execute(&mut *tx)
      .await?;
    set_total(&mut tx, order.id, order.total_amount_cents - item.total_price()?).await?;
    tx.commit().await?;
    Ok(())
  }

  #[instrument(name = "pg_store::cancel_order", skip(self))]
  async fn cancel_order(&self, order_id: Uuid) -> Result<()> {
    let mut tx = self.pool.begin().await?;
    cancel_order_in(&mut tx, order_id).await?;
    tx.commit().await?;
    Ok(())
  }

  async fn cart_for_user(&self, user_id: Uuid) -> Result<CartContents> {
    let mut tx = self.pool.begin().await?;
    let cart = ensure_cart(&mut tx, user_id).await?;
    let items = cart_lines(&mut tx, cart.id, false).await?;
    tx.commit().await?;
    Ok(CartContents { cart, items })
  }

  #[instrument(name = "pg_store::add_cart_item", skip(self))]
  async fn add_cart_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartItem> {
    ensure_positive(quantity)?;
    let mut tx = self.pool.begin().await?;
    let product = lock_product(&mut tx, product_id).await?;
    let cart = ensure_cart(&mut tx, user_id).await?;

    let already: i32 = sqlx::query_scalar("SELECT quantity FROM cart_items WHERE cart_id = $1 AND product_id = $2")
      .bind(cart.id)
      .bind(product_id)
      .fetch_optional(&mut *tx)
      .await?
      .unwrap_or(0);
    let wanted = already
      .checked_add(quantity)
      .filter(|wanted| product.has_stock_for(*wanted))
      .ok_or_else(|| AppError::Validation(format!("Insufficient stock. Only {} available.", product.quantity)))?;

    let item = sqlx::query_as::<_, CartItem>(
      "INSERT INTO cart_items (id, cart_id, product_id, quantity) VALUES ($1, $2, $3, $4) \
       ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity \
       RETURNING id, cart_id, product_id, quantity",
    )
    .bind(Uuid::new_v4())
    .bind(cart.id)
    .bind(product_id)
    .bind(wanted)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(item)
  }

  async fn update_cart_quantity(&self, cart_id: Uuid, product_id: Uuid, quantity: i32) -> Result<()> {
    ensure_positive(quantity)?;
    sqlx::query("UPDATE cart_items SET quantity = $3 WHERE cart_id = $1 AND product_id = $2")
      .bind(cart_id)
      .bind(product_id)
      .bind(quantity)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn remove_cart_item(&self, cart_id: Uuid, product_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
      .bind(cart_id)
      .bind(product_id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  #[instrument(name = "pg_store::checkout", skip(self))]
  async fn checkout(&self, user_id: Uuid) -> Result<CheckoutReceipt> {
    let mut tx = self.pool.begin().await?;
    let cart = ensure_cart(&mut tx, user_id).await?;
    let lines = cart_lines(&mut tx, cart.id, true).await?;
    if lines.is_empty() {
      return Err(AppError::Validation(EMPTY_CART.to_string()));
    }

    let order = Order::new(user_id);
    sqlx::query("INSERT INTO orders (id, user_id, status, total_amount_cents, created_at) VALUES ($1, $2, $3, $4, $5)")
      .bind(order.id)
      .bind(order.user_id)
      .bind(order.status)
      .bind(order.total_amount_cents)
      .bind(order.created_at)
      .execute(&mut *tx)
      .await?;

    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
      items.push(add_order_item_in(&mut tx, order.id, line.item.product_id, line.item.quantity).await?);
    }

    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
      .bind(cart.id)
      .execute(&mut *tx)
      .await?;

    let checkout = sqlx::query_as::<_, Checkout>(
      "INSERT INTO checkouts (id, user_id, order_id, checkout_date) VALUES ($1, $2, $3, $4) \
       RETURNING id, user_id, order_id, checkout_date",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(order.id)
    .bind(chrono::Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    let order = lock_order(&mut tx, order.id).await?;
    tx.commit().await?;
    debug!(order_id = %order.id, lines = items.len(), "Cart checked out.");
    Ok(CheckoutReceipt { checkout, order, items })
  }

  async fn checkouts_for_user(&self, user_id: Uuid) -> Result<Vec<Checkout>> {
    let checkouts = sqlx::query_as::<_, Checkout>(
      "SELECT id, user_id, order_id, checkout_date FROM checkouts WHERE user_id = $1 ORDER BY checkout_date ASC",
    )
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(checkouts)
  }
}
