pub mod health;
pub mod schemas;

use axum::Router;

use crate::state::AppState;

/// Build the `/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /schemas                                         list, create
/// /schemas/{id}                                    get, update, delete
/// /schemas/{schema_id}/validate                    validate candidate entity
/// /schemas/{schema_id}/entities                    list, create
/// /schemas/{schema_id}/entities/{entity_id}        get, update, delete
/// /schemas/{schema_id}/entities/{entity_id}/{attr} get, set relationship
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/schemas", schemas::router())
}
