//! Entistore HTTP API library.
//!
//! Exposes config, state, error handling, handlers and the router so the
//! binary entrypoint and the integration tests build the same app.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
