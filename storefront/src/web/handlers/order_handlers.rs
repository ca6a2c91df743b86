// storefront/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Order, OrderDetails, OrderStatus};
use crate::state::AppState;
use crate::store::order_not_found;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct AddOrderItemPayload {
  pub product_id: Uuid,
  pub quantity: i32,
}

#[derive(Deserialize, Debug)]
pub struct UpdateStatusPayload {
  pub status: OrderStatus,
}

/// Loads an order the caller owns. Someone else's order is reported as missing.
async fn owned_order(app_state: &AppState, order_id: Uuid, auth_user: AuthenticatedUser) -> Result<Order, AppError> {
  match app_state.store.find_order(order_id).await? {
    Some(order) if order.user_id == auth_user.user_id => Ok(order),
    Some(_) => {
      warn!(%order_id, user_id = %auth_user.user_id, "Order belongs to another user.");
      Err(order_not_found(order_id))
    }
    None => Err(order_not_found(order_id)),
  }
}

async fn details(app_state: &AppState, order: Order) -> Result<OrderDetails, AppError> {
  let items = app_state.store.order_items(order.id).await?;
  OrderDetails::new(order, items)
}

#[instrument(name = "handler::create_order", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = app_state.store.create_order(auth_user.user_id).await?;
  info!(order_id = %order.id, "Order created.");
  Ok(HttpResponse::Created().json(json!({
      "message": "Order created.",
      "order": order
  })))
}

#[instrument(name = "handler::get_order", skip(app_state, path, auth_user), fields(order_id = %path.as_ref()))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = owned_order(&app_state, path.into_inner(), auth_user).await?;
  Ok(HttpResponse::Ok().json(details(&app_state, order).await?))
}

#[instrument(
  name = "handler::add_order_item",
  skip(app_state, path, payload, auth_user),
  fields(order_id = %path.as_ref(), product_id = %payload.product_id, quantity = %payload.quantity)
)]
pub async fn add_order_item_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  payload: web::Json<AddOrderItemPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = owned_order(&app_state, path.into_inner(), auth_user).await?;
  let item = app_state
    .store
    .add_order_item(order.id, payload.product_id, payload.quantity)
    .await?;
  info!(order_id = %order.id, item_id = %item.id, "Order item added.");
  Ok(HttpResponse::Created().json(json!({
      "message": "Item added to order.",
      "item": item
  })))
}

#[instrument(name = "handler::cancel_order_item", skip(app_state, path, auth_user))]
pub async fn cancel_order_item_handler(
  app_state: web::Data<AppState>,
  path: web::Path<(Uuid, Uuid)>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let (order_id, item_id) = path.into_inner();
  let order = owned_order(&app_state, order_id, auth_user).await?;
  let belongs = app_state
    .store
    .order_items(order.id)
    .await?
    .iter()
    .any(|item| item.id == item_id);
  if !belongs {
    return Err(AppError::NotFound(format!("Order item with ID {} not found.", item_id)));
  }
  app_state.store.cancel_order_item(item_id).await?;
  info!(%order_id, %item_id, "Order item cancelled.");
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(
  name = "handler::update_order_status",
  skip(app_state, path, payload, auth_user),
  fields(order_id = %path.as_ref(), status = ?payload.status)
)]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  payload: web::Json<UpdateStatusPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = owned_order(&app_state, path.into_inner(), auth_user).await?;
  let order = app_state.store.update_order_status(order.id, payload.status).await?;
  Ok(HttpResponse::Ok().json(json!({
      "message": "Order status updated.",
      "order": order
  })))
}

#[instrument(name = "handler::cancel_order", skip(app_state, path, auth_user), fields(order_id = %path.as_ref()))]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = owned_order(&app_state, path.into_inner(), auth_user).await?;
  app_state.store.cancel_order(order.id).await?;
  info!(order_id = %order.id, "Order cancelled and stock restored.");
  Ok(HttpResponse::NoContent().finish())
}
