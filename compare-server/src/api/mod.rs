//! HTTP API handlers for compare-server

pub mod auth;
pub mod compare;
pub mod health;
pub mod session;

pub use auth::{authorize, session_middleware, verify_request, Caller, SESSION_HEADER};
pub use compare::{add_item, clear_items, get_list, get_matrix, remove_item};
pub use health::health_routes;
pub use session::{create_session, login, logout};
