//! Route definitions for schemas and the entities stored under them.
//!
//! Mounted at `/schemas`.
//!
//! ```text
//! GET    /                                         list_schemas
//! POST   /                                         create_schema
//! GET    /{schema_id}                              get_schema
//! PUT    /{schema_id}                              update_schema
//! DELETE /{schema_id}                              delete_schema
//! PUT    /{schema_id}/validate                     validate_entity
//! GET    /{schema_id}/entities                     list_entities
//! POST   /{schema_id}/entities                     create_entity
//! GET    /{schema_id}/entities/{entity_id}         get_entity
//! PUT    /{schema_id}/entities/{entity_id}         update_entity
//! DELETE /{schema_id}/entities/{entity_id}         delete_entity
//! GET    /{schema_id}/entities/{entity_id}/{attr}  get_relationship
//! PUT    /{schema_id}/entities/{entity_id}/{attr}  set_relationship
//! ```

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::{entities, schemas, validation};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(schemas::list_schemas).post(schemas::create_schema))
        .route(
            "/{schema_id}",
            get(schemas::get_schema)
                .put(schemas::update_schema)
                .delete(schemas::delete_schema),
        )
        .route("/{schema_id}/validate", put(validation::validate_entity))
        .route(
            "/{schema_id}/entities",
            get(entities::list_entities).post(entities::create_entity),
        )
        .route(
            "/{schema_id}/entities/{entity_id}",
            get(entities::get_entity)
                .put(entities::update_entity)
                .delete(entities::delete_entity),
        )
        .route(
            "/{schema_id}/entities/{entity_id}/{attribute}",
            get(entities::get_relationship).put(entities::set_relationship),
        )
}
