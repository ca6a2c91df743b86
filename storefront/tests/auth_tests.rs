// tests/auth_tests.rs
#[macro_use]
mod common;

use actix_web::{http::StatusCode, test};
use serde_json::Value;

use common::*;
use storefront::services::auth_service::verify_password;

fn registration(username: &str, email: &str, password: &str, confirm: &str) -> Vec<(&'static str, String)> {
  vec![
    ("username", username.to_string()),
    ("email", email.to_string()),
    ("password", password.to_string()),
    ("confirm_password", confirm.to_string()),
  ]
}

#[actix_web::test]
async fn test_register_creates_account_with_hashed_password() {
  let (state, store) = memory_state();
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri("/register")
    .set_form(registration("ada", "ada@example.com", "s3cret!", "s3cret!"))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["message"], "Your Account has been Created Successfully");

  let user = store.find_user_by_email("ada@example.com").await.unwrap().unwrap();
  assert_eq!(user.username, "ada");
  assert_ne!(user.password_hash, "s3cret!");
  assert!(verify_password(&user.password_hash, "s3cret!").unwrap());
}

#[actix_web::test]
async fn test_register_rejects_password_mismatch() {
  let (state, store) = memory_state();
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri("/register")
    .set_form(registration("ada", "ada@example.com", "s3cret!", "s3cret?"))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "Passwords do not match. Please try again.");
  assert!(store.list_users().await.unwrap().is_empty());
}

#[actix_web::test]
async fn test_register_rejects_taken_email() {
  let (state, store) = memory_state();
  create_user(store.as_ref(), "ada", "first-pass").await;
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri("/register")
    .set_form(registration("lovelace", "ada@example.com", "other", "other"))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "Email already Registered, Please login");
  assert_eq!(store.list_users().await.unwrap().len(), 1);
}

#[actix_web::test]
async fn test_register_only_accepts_post() {
  let (state, _store) = memory_state();
  let app = init_app!(state);

  for req in [
    test::TestRequest::get().uri("/register").to_request(),
    test::TestRequest::put().uri("/register").to_request(),
  ] {
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Method Not Allowed");
  }
}

#[actix_web::test]
async fn test_register_with_missing_field_is_bad_request() {
  let (state, _store) = memory_state();
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri("/register")
    .set_form([("username", "ada"), ("email", "ada@example.com")])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_login_checks_password() {
  let (state, store) = memory_state();
  let user = create_user(store.as_ref(), "ada", "s3cret!").await;
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri("/login")
    .set_form([("email", "ada@example.com"), ("password", "s3cret!")])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["user_id"], user.id.to_string());

  let req = test::TestRequest::post()
    .uri("/login")
    .set_form([("email", "ada@example.com"), ("password", "wrong")])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_protected_routes_need_user_header() {
  let (state, _store) = memory_state();
  let app = init_app!(state);

  let resp = test::call_service(&app, test::TestRequest::get().uri("/cart").to_request()).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let req = test::TestRequest::get()
    .uri("/cart")
    .insert_header(("X-User-ID", "not-a-uuid"))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
