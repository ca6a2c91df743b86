// storefront/src/state.rs
use crate::config::AppConfig;
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn Store>,
  pub config: Arc<AppConfig>, // Share loaded config
}

impl AppState {
  pub fn new(store: Arc<dyn Store>, config: Arc<AppConfig>) -> Self {
    Self { store, config }
  }

  pub fn base_url(&self) -> &str {
    &self.config.app_base_url
  }
}
