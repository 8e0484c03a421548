//! HTTP surface for the Warden account service.
//!
//! The binary in `main.rs` wires configuration, persistence and the router
//! together. Everything it needs lives here so integration tests can build
//! the same router against an in-memory store.

pub mod infra;
pub mod routes;
pub mod users;

pub use infra::app_state::AppState;
