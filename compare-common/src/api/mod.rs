//! API support shared with the HTTP layer
//!
//! Contains ONLY pure functions and shared types; the axum wiring lives in
//! `compare-server`.

pub mod auth;

pub use auth::{
    generate_salt, generate_token, hash_password, validate_session_age, validate_token,
    verify_password, SessionAuthError,
};
