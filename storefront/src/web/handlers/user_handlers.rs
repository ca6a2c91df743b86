// storefront/src/web/handlers/user_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{User, UserExport};
use crate::state::AppState;
use crate::store::user_not_found;
use crate::web::extractors::AuthenticatedUser;

/// Account routes act only on the caller's own account; any other id is reported as missing.
fn ensure_self(auth_user: AuthenticatedUser, user_id: Uuid) -> Result<(), AppError> {
  if auth_user.user_id != user_id {
    warn!(%user_id, caller = %auth_user.user_id, "Account belongs to another user.");
    return Err(user_not_found(user_id));
  }
  Ok(())
}

async fn load_user(app_state: &AppState, user_id: Uuid) -> Result<User, AppError> {
  app_state
    .store
    .find_user(user_id)
    .await?
    .ok_or_else(|| user_not_found(user_id))
}

async fn export(app_state: &AppState, user: &User) -> Result<UserExport, AppError> {
  let orders = app_state.store.orders_for_user(user.id).await?;
  Ok(user.export_data(app_state.base_url(), &orders))
}

/// Public directory: usernames and links only.
#[instrument(name = "handler::list_users", skip(app_state))]
pub async fn list_users_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let users: Vec<Value> = app_state
    .store
    .list_users()
    .await?
    .iter()
    .map(|user| {
      json!({
          "self_url": user.url(app_state.base_url()),
          "username": user.username,
      })
    })
    .collect();
  Ok(HttpResponse::Ok().json(json!({ "users": users })))
}

#[instrument(name = "handler::get_user", skip(app_state, path, auth_user), fields(user_id = %path.as_ref()))]
pub async fn get_user_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let user_id = path.into_inner();
  ensure_self(auth_user, user_id)?;
  let user = load_user(&app_state, user_id).await?;
  Ok(HttpResponse::Ok().json(export(&app_state, &user).await?))
}

#[instrument(name = "handler::update_user", skip(app_state, path, body, auth_user), fields(user_id = %path.as_ref()))]
pub async fn update_user_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  body: web::Json<Value>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let user_id = path.into_inner();
  ensure_self(auth_user, user_id)?;
  let mut user = load_user(&app_state, user_id).await?;
  user.import_data(&body)?;
  let user = app_state.store.update_user(&user).await?;
  info!(user_id = %user.id, "User updated.");
  Ok(HttpResponse::Ok().json(export(&app_state, &user).await?))
}

#[instrument(name = "handler::delete_user", skip(app_state, path, auth_user), fields(user_id = %path.as_ref()))]
pub async fn delete_user_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let user_id = path.into_inner();
  ensure_self(auth_user, user_id)?;
  app_state.store.delete_user(user_id).await?;
  info!(%user_id, "User deleted.");
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::get_user_orders", skip(app_state, path, auth_user), fields(user_id = %path.as_ref()))]
pub async fn get_user_orders_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let user_id = path.into_inner();
  ensure_self(auth_user, user_id)?;
  let user = load_user(&app_state, user_id).await?;
  let orders = app_state.store.orders_for_user(user.id).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}
