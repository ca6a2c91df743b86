// storefront/src/lib.rs

//! Storefront backend: user registration, product catalog, carts, orders and checkout over an
//! actix-web JSON API.

pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod state;
pub mod store;
pub mod web;

use std::sync::Arc;

use crate::config::{AppConfig, StoreBackend};
use crate::errors::{AppError, Result};
use crate::store::{MemoryStore, PgStore, Store};

/// Opens the configured store, applying migrations and the sample catalog when enabled.
pub async fn build_store(config: &AppConfig) -> Result<Arc<dyn Store>> {
  let store: Arc<dyn Store> = match config.store_backend {
    StoreBackend::Postgres => {
      let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| AppError::Config("DATABASE_URL is not set".to_string()))?;
      let pg = PgStore::connect(url, config.database_max_connections).await?;
      if config.run_migrations {
        pg.migrate().await?;
      }
      Arc::new(pg)
    }
    StoreBackend::Memory => {
      tracing::warn!("Using the in-memory store; data is lost on shutdown.");
      Arc::new(MemoryStore::new())
    }
  };

  if config.seed_db {
    services::seed_service::seed_catalog(store.as_ref()).await?;
  }
  Ok(store)
}
