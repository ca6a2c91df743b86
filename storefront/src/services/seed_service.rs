// storefront/src/services/seed_service.rs

use tracing::{info, instrument};

use crate::errors::Result;
use crate::models::NewProduct;
use crate::store::Store;

fn sample_catalog() -> Vec<NewProduct> {
  [
    ("Espresso Beans 1kg", 2450, Some("Dark roast, whole bean."), 40),
    ("Pour-over Kettle", 5900, Some("Gooseneck, 1.2L."), 12),
    ("Ceramic Mug", 1200, None, 100),
    ("Paper Filters (100)", 650, Some("Size 02."), 250),
  ]
  .into_iter()
  .map(|(name, price_cents, description, quantity)| NewProduct {
    name: name.to_string(),
    price_cents,
    description: description.map(str::to_string),
    quantity,
  })
  .collect()
}

/// Inserts a small sample catalog when no products exist. Returns how many products were added.
#[instrument(name = "seed_service::seed_catalog", skip(store))]
pub async fn seed_catalog(store: &dyn Store) -> Result<usize> {
  if !store.list_products().await?.is_empty() {
    info!("Catalog already populated, skipping seed.");
    return Ok(0);
  }
  let catalog = sample_catalog();
  let count = catalog.len();
  for product in catalog {
    store.insert_product(product).await?;
  }
  info!(count, "Seeded sample catalog.");
  Ok(count)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::MemoryStore;

  #[tokio::test]
  async fn seeds_once() {
    let store = MemoryStore::new();
    let added = seed_catalog(&store).await.unwrap();
    assert_eq!(added, 4);
    assert_eq!(seed_catalog(&store).await.unwrap(), 0);
    assert_eq!(store.list_products().await.unwrap().len(), 4);
  }
}
