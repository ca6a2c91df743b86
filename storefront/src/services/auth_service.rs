// storefront/src/services/auth_service.rs

//! Password hashing and account registration/login.

use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::{AppError, Result};
use crate::models::User;
use crate::store::Store;

pub const PASSWORD_MISMATCH: &str = "Passwords do not match. Please try again.";
pub const EMAIL_TAKEN: &str = "Email already Registered, Please login";
pub const USERNAME_TAKEN: &str = "Username already taken";
pub const INVALID_CREDENTIALS: &str = "Invalid email or password.";

/// Hashes a plain-text password using Argon2 with a random salt.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  match Argon2::default().hash_password(password.as_bytes(), &salt) {
    Ok(hash) => {
      debug!("Password hashed successfully.");
      Ok(hash.to_string())
    }
    Err(argon_err) => {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      Err(AppError::Internal(format!("Password hashing process failed: {}", argon_err)))
    }
  }
}

/// Verifies a plain-text password against a stored Argon2 hash. A mismatch is `Ok(false)`; a
/// malformed stored hash is an internal error.
#[instrument(
  name = "auth_service::verify_password",
  skip(hashed_password_str, provided_password),
  err(Display),
  fields(hash_len = hashed_password_str.len())
)]
pub fn verify_password(hashed_password_str: &str, provided_password: &str) -> Result<bool> {
  if hashed_password_str.is_empty() || provided_password.is_empty() {
    return Ok(false);
  }

  let parsed_hash = PasswordHash::new(hashed_password_str).map_err(|parse_err| {
    error!(error = %parse_err, "Failed to parse stored password hash string.");
    AppError::Internal(format!("Invalid stored password hash format: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password verification failed: Passwords do not match.");
      Ok(false)
    }
    Err(other_argon_err) => {
      error!(error = %other_argon_err, "Argon2 password verification process encountered an error.");
      Err(AppError::Internal(format!(
        "Password verification process failed: {}",
        other_argon_err
      )))
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
  pub username: String,
  pub email: String,
  pub password: String,
  pub confirm_password: String,
}

/// Creates an account: passwords must match, the email must be unused, the password is stored hashed.
#[instrument(name = "auth_service::register", skip(store, registration), fields(email = %registration.email))]
pub async fn register(store: &dyn Store, registration: Registration) -> Result<User> {
  if registration.password != registration.confirm_password {
    warn!("Registration rejected: password confirmation mismatch.");
    return Err(AppError::Validation(PASSWORD_MISMATCH.to_string()));
  }
  if registration.username.trim().is_empty() || registration.email.trim().is_empty() {
    return Err(AppError::Validation("Username and email are required.".to_string()));
  }

  if store.find_user_by_email(&registration.email).await?.is_some() {
    warn!("Registration rejected: email already registered.");
    return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
  }

  let mut user = User::new(registration.username, registration.email);
  user.set_password(&registration.password)?;
  let user = store.insert_user(user).await?;
  info!(user_id = %user.id, "User registered.");
  Ok(user)
}

/// Checks credentials and returns the matching user. Unknown email and wrong password look the same.
#[instrument(name = "auth_service::login", skip(store, password))]
pub async fn login(store: &dyn Store, email: &str, password: &str) -> Result<User> {
  let user = store
    .find_user_by_email(email)
    .await?
    .ok_or_else(|| AppError::Auth(INVALID_CREDENTIALS.to_string()))?;

  if !user.check_password(password)? {
    warn!(user_id = %user.id, "Login rejected: wrong password.");
    return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
  }
  info!(user_id = %user.id, "Login successful.");
  Ok(user)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_is_salted() {
    let a = hash_password("hunter22").unwrap();
    let b = hash_password("hunter22").unwrap();
    assert_ne!(a, b);
    assert!(verify_password(&a, "hunter22").unwrap());
    assert!(verify_password(&b, "hunter22").unwrap());
  }

  #[test]
  fn empty_password_cannot_be_hashed() {
    assert!(matches!(hash_password(""), Err(AppError::Validation(_))));
  }

  #[test]
  fn empty_inputs_never_verify() {
    let hash = hash_password("hunter22").unwrap();
    assert!(!verify_password(&hash, "").unwrap());
    assert!(!verify_password("", "hunter22").unwrap());
  }

  #[test]
  fn garbage_hash_is_internal_error() {
    assert!(matches!(
      verify_password("not-a-phc-string", "hunter22"),
      Err(AppError::Internal(_))
    ));
  }
}
