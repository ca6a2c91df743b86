// storefront/src/services/mod.rs

//! Application services sitting between the HTTP handlers and the `Store`.

pub mod auth_service;
pub mod seed_service;
