// tests/postgres_store_tests.rs
//! Runs against a live database: `DATABASE_URL=postgres://... cargo test -- --ignored`.
mod common;

use serial_test::serial;

use common::*;
use storefront::errors::AppError;
use storefront::models::{OrderStatus, StockAdjustment, User};
use storefront::store::{PgStore, Store};

async fn fresh_store() -> PgStore {
  setup_tracing();
  let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for postgres tests");
  let store = PgStore::connect(&url, 2).await.unwrap();
  store.migrate().await.unwrap();
  sqlx::query("TRUNCATE checkouts, cart_items, carts, order_items, orders, products, users")
    .execute(store.pool())
    .await
    .unwrap();
  store
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_pg_duplicate_email_and_username_conflict() {
  let store = fresh_store().await;
  create_user(&store, "ada", "pw").await;

  let err = store.insert_user(User::new("ada", "other@example.com")).await.unwrap_err();
  assert!(matches!(err, AppError::Conflict(m) if m == "Username already taken"));
  let err = store.insert_user(User::new("lovelace", "ada@example.com")).await.unwrap_err();
  assert!(matches!(err, AppError::Conflict(m) if m == "Email already Registered, Please login"));
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_pg_order_cancel_restores_stock() {
  let store = fresh_store().await;
  let user = create_user(&store, "ada", "pw").await;
  let mug = create_product(&store, "Mug", 1200, 10).await;

  let order = store.create_order(user.id).await.unwrap();
  store.add_order_item(order.id, mug.id, 4).await.unwrap();
  assert_eq!(stock_of(&store, mug.id).await, 6);
  let err = store.add_order_item(order.id, mug.id, 7).await.unwrap_err();
  assert!(matches!(err, AppError::Validation(_)));
  assert_eq!(stock_of(&store, mug.id).await, 6);

  let order = store.update_order_status(order.id, OrderStatus::Shipped).await.unwrap();
  assert_eq!(order.status, OrderStatus::Shipped);
  assert_eq!(order.total_amount_cents, 4 * 1200);

  store.cancel_order(order.id).await.unwrap();
  assert_eq!(stock_of(&store, mug.id).await, 10);
  assert!(store.find_order(order.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_pg_checkout_is_all_or_nothing() {
  let store = fresh_store().await;
  let user = create_user(&store, "ada", "pw").await;
  let beans = create_product(&store, "Beans", 2450, 10).await;
  let mug = create_product(&store, "Mug", 1200, 4).await;
  store.add_cart_item(user.id, beans.id, 2).await.unwrap();
  store.add_cart_item(user.id, mug.id, 4).await.unwrap();
  store.adjust_stock(mug.id, StockAdjustment::Reduce(1)).await.unwrap();

  assert!(matches!(store.checkout(user.id).await, Err(AppError::Validation(_))));
  assert_eq!(stock_of(&store, beans.id).await, 10);
  assert_eq!(store.cart_for_user(user.id).await.unwrap().items.len(), 2);
  assert!(store.orders_for_user(user.id).await.unwrap().is_empty());

  let cart_id = store.cart_for_user(user.id).await.unwrap().cart.id;
  store.update_cart_quantity(cart_id, mug.id, 3).await.unwrap();
  let receipt = store.checkout(user.id).await.unwrap();
  assert_eq!(receipt.order.total_amount_cents, 2 * 2450 + 3 * 1200);
  assert_eq!(stock_of(&store, mug.id).await, 0);
  assert!(store.cart_for_user(user.id).await.unwrap().is_empty());
  assert_eq!(store.checkouts_for_user(user.id).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_pg_delete_user_cascades() {
  let store = fresh_store().await;
  let user = create_user(&store, "ada", "pw").await;
  let mug = create_product(&store, "Mug", 1200, 5).await;
  let order = store.create_order(user.id).await.unwrap();
  store.add_order_item(order.id, mug.id, 5).await.unwrap();

  store.delete_user(user.id).await.unwrap();
  assert_eq!(stock_of(&store, mug.id).await, 5);
  assert!(store.find_order(order.id).await.unwrap().is_none());
  assert!(store.order_items_for_product(mug.id).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_pg_rejects_overflowing_quantities_and_amounts() {
  let store = fresh_store().await;
  let user = create_user(&store, "ada", "pw").await;
  let mug = create_product(&store, "Mug", 1200, 10).await;
  let gold = create_product(&store, "Gold", i64::MAX / 2, 10).await;

  store.add_cart_item(user.id, mug.id, 5).await.unwrap();
  assert!(matches!(
    store.add_cart_item(user.id, mug.id, i32::MAX).await,
    Err(AppError::Validation(_))
  ));
  assert_eq!(store.cart_for_user(user.id).await.unwrap().items[0].item.quantity, 5);

  let order = store.create_order(user.id).await.unwrap();
  assert!(matches!(
    store.add_order_item(order.id, gold.id, 3).await,
    Err(AppError::Validation(_))
  ));
  assert_eq!(stock_of(&store, gold.id).await, 10);
  assert_eq!(store.find_order(order.id).await.unwrap().unwrap().total_amount_cents, 0);
}
