// tests/common/mod.rs
#![allow(dead_code)] // Not every test binary uses every helper

use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::Level;
use uuid::Uuid;

use storefront::config::{AppConfig, StoreBackend};
use storefront::models::{NewProduct, Product, User};
use storefront::state::AppState;
use storefront::store::{MemoryStore, Store};

pub const BASE_URL: &str = "http://shop.test";

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok(); // Several test binaries may race to install it
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub fn test_config() -> AppConfig {
  AppConfig {
    server_host: "127.0.0.1".to_string(),
    server_port: 0,
    store_backend: StoreBackend::Memory,
    database_url: None,
    database_max_connections: 1,
    app_base_url: BASE_URL.to_string(),
    run_migrations: false,
    seed_db: false,
  }
}

/// App state over a fresh in-memory store, plus a handle on that store for direct assertions.
pub fn memory_state() -> (AppState, Arc<dyn Store>) {
  setup_tracing();
  let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
  (AppState::new(store.clone(), Arc::new(test_config())), store)
}

/// Builds the full route table around `state` as a test service.
#[allow(unused_macros)]
macro_rules! init_app {
  ($state:expr) => {
    actix_web::test::init_service(
      actix_web::App::new()
        .app_data(actix_web::web::Data::new($state.clone()))
        .configure(storefront::web::configure_app_routes),
    )
    .await
  };
}

pub async fn create_user(store: &dyn Store, username: &str, password: &str) -> User {
  let mut user = User::new(username, format!("{}@example.com", username));
  user.set_password(password).unwrap();
  store.insert_user(user).await.unwrap()
}

pub async fn create_product(store: &dyn Store, name: &str, price_cents: i64, quantity: i32) -> Product {
  store
    .insert_product(NewProduct {
      name: name.to_string(),
      price_cents,
      description: None,
      quantity,
    })
    .await
    .unwrap()
}

pub async fn stock_of(store: &dyn Store, product_id: Uuid) -> i32 {
  store.find_product(product_id).await.unwrap().unwrap().quantity
}

pub fn user_header(user: &User) -> (&'static str, String) {
  ("X-User-ID", user.id.to_string())
}
