// storefront/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[instrument(name = "handler::checkout", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn checkout_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let receipt = app_state.store.checkout(auth_user.user_id).await?;
  info!(
    order_id = %receipt.order.id,
    checkout_id = %receipt.checkout.id,
    total_cents = receipt.order.total_amount_cents,
    "Checkout completed."
  );
  Ok(HttpResponse::Created().json(json!({
      "message": "Checkout completed.",
      "checkout": receipt.checkout,
      "order": receipt.order,
      "items": receipt.items,
  })))
}

#[instrument(name = "handler::list_checkouts", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn list_checkouts_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let checkouts = app_state.store.checkouts_for_user(auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "checkouts": checkouts })))
}
