// storefront/src/web/routes.rs

use actix_web::{error::InternalError, web, HttpResponse};

use crate::errors::AppError;
use crate::web::handlers::{
  auth_handlers, cart_handlers, checkout_handlers, order_handlers, product_handlers, user_handlers,
};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Malformed form/JSON/path input becomes a JSON validation error instead of actix's plain-text 400.
fn payload_error(err: impl std::fmt::Display) -> actix_web::Error {
  let app_err = AppError::Validation(err.to_string());
  let response = actix_web::ResponseError::error_response(&app_err);
  InternalError::from_response(app_err, response).into()
}

/// Registers every route on an actix `App`.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(web::FormConfig::default().error_handler(|err, _req| payload_error(err)))
    .app_data(web::JsonConfig::default().error_handler(|err, _req| payload_error(err)))
    .app_data(web::PathConfig::default().error_handler(|err, _req| payload_error(err)))
    .route("/health", web::get().to(health_check_handler))
    // Authentication
    .service(
      web::resource("/register")
        .route(web::post().to(auth_handlers::register_handler))
        .default_service(web::to(auth_handlers::method_not_allowed_handler)),
    )
    .service(
      web::resource("/login")
        .route(web::post().to(auth_handlers::login_handler))
        .default_service(web::to(auth_handlers::method_not_allowed_handler)),
    )
    // Users (X-User-ID on everything but the listing)
    .service(
      web::scope("/users")
        .route("", web::get().to(user_handlers::list_users_handler))
        .route("/{user_id}", web::get().to(user_handlers::get_user_handler))
        .route("/{user_id}", web::put().to(user_handlers::update_user_handler))
        .route("/{user_id}", web::delete().to(user_handlers::delete_user_handler))
        .route("/{user_id}/orders", web::get().to(user_handlers::get_user_orders_handler)),
    )
    // Products
    .service(
      web::scope("/products")
        .route("", web::get().to(product_handlers::list_products_handler))
        .route("", web::post().to(product_handlers::create_product_handler))
        .route("/{product_id}", web::get().to(product_handlers::get_product_handler))
        .route("/{product_id}", web::put().to(product_handlers::update_product_handler))
        .route("/{product_id}/stock", web::post().to(product_handlers::adjust_stock_handler))
        .route(
          "/{product_id}/order-items",
          web::get().to(product_handlers::product_order_items_handler),
        ),
    )
    // Cart (X-User-ID)
    .service(
      web::scope("/cart")
        .route("", web::get().to(cart_handlers::view_cart_handler))
        .route("/items", web::post().to(cart_handlers::add_to_cart_handler))
        .route("/items/{product_id}", web::put().to(cart_handlers::update_cart_item_handler))
        .route("/items/{product_id}", web::delete().to(cart_handlers::remove_cart_item_handler)),
    )
    // Orders (X-User-ID)
    .service(
      web::scope("/orders")
        .route("", web::post().to(order_handlers::create_order_handler))
        .route("/{order_id}", web::get().to(order_handlers::get_order_handler))
        .route("/{order_id}", web::delete().to(order_handlers::cancel_order_handler))
        .route("/{order_id}/status", web::put().to(order_handlers::update_order_status_handler))
        .route("/{order_id}/items", web::post().to(order_handlers::add_order_item_handler))
        .route(
          "/{order_id}/items/{item_id}",
          web::delete().to(order_handlers::cancel_order_item_handler),
        ),
    )
    // Checkout (X-User-ID)
    .service(
      web::resource("/checkout")
        .route(web::post().to(checkout_handlers::checkout_handler))
        .route(web::get().to(checkout_handlers::list_checkouts_handler)),
    );
}
