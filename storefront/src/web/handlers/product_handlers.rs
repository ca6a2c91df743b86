// storefront/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{NewProduct, Product, ProductExport, StockAdjustment};
use crate::state::AppState;
use crate::store::product_not_found;

async fn load_product(app_state: &AppState, product_id: Uuid) -> Result<Product, AppError> {
  match app_state.store.find_product(product_id).await? {
    Some(product) => Ok(product),
    None => {
      warn!("Product with ID {} not found.", product_id);
      Err(product_not_found(product_id))
    }
  }
}

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let products: Vec<ProductExport> = app_state
    .store
    .list_products()
    .await?
    .iter()
    .map(|p| p.export_data(app_state.base_url()))
    .collect();
  info!("Successfully fetched {} products.", products.len());

  Ok(HttpResponse::Ok().json(json!({
      "message": "Products fetched successfully.",
      "products": products
  })))
}

#[instrument(name = "handler::get_product", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product = load_product(&app_state, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({
      "message": "Product fetched successfully.",
      "id": product.id,
      "product": product.export_data(app_state.base_url())
  })))
}

#[instrument(name = "handler::create_product", skip(app_state, payload), fields(name = %payload.name))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<NewProduct>,
) -> Result<HttpResponse, AppError> {
  let product = app_state.store.insert_product(payload.into_inner()).await?;
  info!(product_id = %product.id, "Product created.");
  Ok(HttpResponse::Created().json(json!({
      "message": "Product created successfully.",
      "id": product.id,
      "product": product.export_data(app_state.base_url())
  })))
}

#[instrument(name = "handler::update_product", skip(app_state, path, body), fields(product_id = %path.as_ref()))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
  let mut product = load_product(&app_state, path.into_inner()).await?;
  product.import_data(&body)?;
  let product = app_state.store.update_product(&product).await?;
  Ok(HttpResponse::Ok().json(json!({
      "message": "Product updated successfully.",
      "id": product.id,
      "product": product.export_data(app_state.base_url())
  })))
}

#[instrument(name = "handler::adjust_stock", skip(app_state, path, adjustment), fields(product_id = %path.as_ref()))]
pub async fn adjust_stock_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  adjustment: web::Json<StockAdjustment>,
) -> Result<HttpResponse, AppError> {
  let adjustment = adjustment.into_inner();
  let product = app_state.store.adjust_stock(path.into_inner(), adjustment).await?;
  info!(product_id = %product.id, ?adjustment, stock = product.quantity, "Stock adjusted.");
  Ok(HttpResponse::Ok().json(json!({
      "message": "Stock updated.",
      "id": product.id,
      "quantity": product.quantity
  })))
}

#[instrument(name = "handler::product_order_items", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn product_order_items_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product = load_product(&app_state, path.into_inner()).await?;
  let items = app_state.store.order_items_for_product(product.id).await?;
  Ok(HttpResponse::Ok().json(json!({ "order_items": items })))
}
