// storefront/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::services::auth_service::{self, Registration};
use crate::state::AppState;

pub const REGISTERED: &str = "Your Account has been Created Successfully";

#[derive(Deserialize, Debug)]
pub struct LoginForm {
  pub email: String,
  pub password: String,
}

#[instrument(
  name = "handler::register",
  skip(app_state, form),
  fields(req_email = %form.email, req_username = %form.username)
)]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  form: web::Form<Registration>,
) -> Result<HttpResponse, AppError> {
  let user = auth_service::register(app_state.store.as_ref(), form.into_inner()).await?;
  info!(user_id = %user.id, "Registration successful.");
  Ok(HttpResponse::Ok().json(json!({ "message": REGISTERED })))
}

#[instrument(name = "handler::login", skip(app_state, form), fields(req_email = %form.email))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  form: web::Form<LoginForm>,
) -> Result<HttpResponse, AppError> {
  let user = auth_service::login(app_state.store.as_ref(), &form.email, &form.password).await?;
  Ok(HttpResponse::Ok().json(json!({
      "message": "Signin successful.",
      "user_id": user.id,
      "username": user.username,
  })))
}

/// Fallback for unsupported methods on `/register` and `/login`.
pub async fn method_not_allowed_handler() -> HttpResponse {
  HttpResponse::MethodNotAllowed().json(json!({ "message": "Method Not Allowed" }))
}
