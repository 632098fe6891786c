use std::sync::Arc;

use entistore_db::Repositories;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: the repositories and the config sit behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Schema and entity repositories for the configured backend.
    pub repos: Repositories,
    pub config: Arc<ServerConfig>,
}
