// storefront/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::CartContents;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct AddToCartRequestPayload {
  pub product_id: Uuid,
  pub quantity: i32,
}

#[derive(Deserialize, Debug)]
pub struct UpdateQuantityPayload {
  pub quantity: i32,
}

fn cart_response(message: &str, contents: &CartContents) -> Result<HttpResponse, AppError> {
  let total_cents = contents.calculate_total_cost()?;
  Ok(HttpResponse::Ok().json(json!({
      "message": message,
      "cart_id": contents.cart.id,
      "items": contents.items,
      "total_cents": total_cents,
  })))
}

#[instrument(name = "handler::view_cart", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn view_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let contents = app_state.store.cart_for_user(auth_user.user_id).await?;
  cart_response("Cart fetched successfully.", &contents)
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, req_payload, auth_user),
  fields(user_id = %auth_user.user_id, product_id = %req_payload.product_id, quantity = %req_payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<AddToCartRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let item = app_state
    .store
    .add_cart_item(auth_user.user_id, req_payload.product_id, req_payload.quantity)
    .await?;
  info!(
    "Add to cart successful for user: {}. Item ID: {}, Product ID: {}, New Quantity: {}",
    auth_user.user_id, item.id, item.product_id, item.quantity
  );
  Ok(HttpResponse::Ok().json(json!({
      "message": "Item added to cart successfully.",
      "cartItem": item
  })))
}

#[instrument(name = "handler::update_cart_item", skip(app_state, path, payload, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn update_cart_item_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  payload: web::Json<UpdateQuantityPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let cart = app_state.store.cart_for_user(auth_user.user_id).await?;
  app_state
    .store
    .update_cart_quantity(cart.cart.id, path.into_inner(), payload.quantity)
    .await?;
  let contents = app_state.store.cart_for_user(auth_user.user_id).await?;
  cart_response("Cart updated.", &contents)
}

#[instrument(name = "handler::remove_cart_item", skip(app_state, path, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn remove_cart_item_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let cart = app_state.store.cart_for_user(auth_user.user_id).await?;
  app_state
    .store
    .remove_cart_item(cart.cart.id, path.into_inner())
    .await?;
  let contents = app_state.store.cart_for_user(auth_user.user_id).await?;
  cart_response("Item removed from cart.", &contents)
}
