// storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

/// Which `Store` implementation the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
  Postgres,
  Memory,
}

impl FromStr for StoreBackend {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_lowercase().as_str() {
      "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
      "memory" => Ok(StoreBackend::Memory),
      other => Err(AppError::Config(format!(
        "Invalid STORE_BACKEND '{}': expected 'postgres' or 'memory'",
        other
      ))),
    }
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub store_backend: StoreBackend,
  /// Required for the Postgres backend only.
  pub database_url: Option<String>,
  pub database_max_connections: u32,
  /// Prefix for `self_url`/`orders_url` links in exported entities.
  pub app_base_url: String,
  pub run_migrations: bool,
  pub seed_db: bool,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from an arbitrary variable lookup so it can be exercised without touching
  /// the process environment.
  pub fn from_lookup<F>(lookup: F) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get_or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

    let server_host = get_or("SERVER_HOST", "127.0.0.1");
    let server_port = get_or("SERVER_PORT", "8080")
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let store_backend = get_or("STORE_BACKEND", "postgres").parse::<StoreBackend>()?;

    let database_url = lookup("DATABASE_URL");
    if store_backend == StoreBackend::Postgres && database_url.is_none() {
      return Err(AppError::Config(
        "Missing environment variable 'DATABASE_URL' (required for the postgres backend)".to_string(),
      ));
    }
    let database_max_connections = get_or("DATABASE_MAX_CONNECTIONS", "5")
      .parse::<u32>()
      .map_err(|e| AppError::Config(format!("Invalid DATABASE_MAX_CONNECTIONS: {}", e)))?;

    let app_base_url = lookup("APP_BASE_URL")
      .unwrap_or_else(|| format!("http://{}:{}", server_host, server_port))
      .trim_end_matches('/')
      .to_string();

    let run_migrations = get_or("RUN_MIGRATIONS", "true")
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid RUN_MIGRATIONS value: {}", e)))?;
    let seed_db = get_or("SEED_DB", "false")
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid SEED_DB value: {}", e)))?;

    tracing::info!(backend = ?store_backend, "Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      store_backend,
      database_url,
      database_max_connections,
      app_base_url,
      run_migrations,
      seed_db,
    })
  }

  pub fn server_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig> {
    let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    AppConfig::from_lookup(|name| map.get(name).cloned())
  }

  #[test]
  fn memory_backend_needs_no_database_url() {
    let cfg = config_from(&[("STORE_BACKEND", "memory")]).unwrap();
    assert_eq!(cfg.store_backend, StoreBackend::Memory);
    assert_eq!(cfg.server_address(), "127.0.0.1:8080");
    assert_eq!(cfg.app_base_url, "http://127.0.0.1:8080");
    assert!(cfg.run_migrations);
    assert!(!cfg.seed_db);
  }

  #[test]
  fn postgres_backend_requires_database_url() {
    let err = config_from(&[]).unwrap_err();
    assert!(matches!(err, AppError::Config(_)));

    let cfg = config_from(&[("DATABASE_URL", "postgres://localhost/shop")]).unwrap();
    assert_eq!(cfg.store_backend, StoreBackend::Postgres);
    assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/shop"));
  }

  #[test]
  fn invalid_values_are_config_errors() {
    assert!(matches!(
      config_from(&[("STORE_BACKEND", "memory"), ("SERVER_PORT", "eighty")]),
      Err(AppError::Config(_))
    ));
    assert!(matches!(
      config_from(&[("STORE_BACKEND", "redis")]),
      Err(AppError::Config(_))
    ));
    assert!(matches!(
      config_from(&[("STORE_BACKEND", "memory"), ("SEED_DB", "yes")]),
      Err(AppError::Config(_))
    ));
  }

  #[test]
  fn base_url_trailing_slash_is_trimmed() {
    let cfg = config_from(&[("STORE_BACKEND", "memory"), ("APP_BASE_URL", "https://shop.example/")]).unwrap();
    assert_eq!(cfg.app_base_url, "https://shop.example");
  }
}
