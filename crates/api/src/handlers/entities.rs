//! Handlers for entities stored under a schema, and for reading and
//! writing a single relationship attribute.
//!
//! Every write is validated against the schema before the repository sees
//! it.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::Value;

use entistore_core::entity::Entity;
use entistore_core::error::CoreError;

use super::ensure_schema_exists;
use super::validation::ensure_valid;
use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::response::ValueResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /schemas/{schema_id}/entities
// ---------------------------------------------------------------------------

pub async fn list_entities(
    State(state): State<AppState>,
    Path(schema_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let schema = ensure_schema_exists(&state, &schema_id).await?;
    let entities = state.repos.entities_for(&schema).find_all().await?;
    tracing::debug!(schema_id = %schema.id, count = entities.len(), "Listed entities");
    Ok(Json(ValueResponse { value: entities }))
}

// ---------------------------------------------------------------------------
// POST /schemas/{schema_id}/entities
// ---------------------------------------------------------------------------

/// Create an entity. The path decides the schema and the server assigns the
/// id, whatever the body says.
pub async fn create_entity(
    State(state): State<AppState>,
    Path(schema_id): Path<String>,
    AppJson(mut entity): AppJson<Entity>,
) -> AppResult<impl IntoResponse> {
    let schema = ensure_schema_exists(&state, &schema_id).await?;

    entity.id = None;
    entity.schema_id = Some(Value::String(schema.id.clone()));
    ensure_valid(&schema, &entity)?;

    let created = state.repos.entities_for(&schema).create(&entity).await?;
    tracing::info!(entity_id = %created.record.id, schema_id = %schema.id, "Entity created");
    Ok((StatusCode::CREATED, Json(ValueResponse { value: created })))
}

// ---------------------------------------------------------------------------
// GET /schemas/{schema_id}/entities/{entity_id}
// ---------------------------------------------------------------------------

pub async fn get_entity(
    State(state): State<AppState>,
    Path((schema_id, entity_id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let schema = ensure_schema_exists(&state, &schema_id).await?;
    let entity = state
        .repos
        .entities_for(&schema)
        .find_by_id(&entity_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Entity", &entity_id))?;
    Ok(Json(ValueResponse { value: entity }))
}

// ---------------------------------------------------------------------------
// PUT /schemas/{schema_id}/entities/{entity_id}
// ---------------------------------------------------------------------------

/// Replace an entity's scalar attributes and any relationship attributes
/// present in the body.
pub async fn update_entity(
    State(state): State<AppState>,
    Path((schema_id, entity_id)): Path<(String, String)>,
    AppJson(mut entity): AppJson<Entity>,
) -> AppResult<impl IntoResponse> {
    let schema = ensure_schema_exists(&state, &schema_id).await?;

    if let Some(body_id) = &entity.id {
        if body_id.as_str() != Some(entity_id.as_str()) {
            return Err(AppError::BadRequest(format!(
                "Body id {body_id} does not match path id {entity_id}"
            )));
        }
    }
    if entity.schema_id.is_none() {
        entity.schema_id = Some(Value::String(schema.id.clone()));
    }
    ensure_valid(&schema, &entity)?;

    let updated = state
        .repos
        .entities_for(&schema)
        .update(&entity_id, &entity)
        .await?
        .ok_or_else(|| CoreError::not_found("Entity", &entity_id))?;
    tracing::info!(entity_id = %entity_id, schema_id = %schema.id, "Entity updated");
    Ok(Json(ValueResponse { value: updated }))
}

// ---------------------------------------------------------------------------
// DELETE /schemas/{schema_id}/entities/{entity_id}
// ---------------------------------------------------------------------------

/// Delete an entity and every edge pointing to or from it.
pub async fn delete_entity(
    State(state): State<AppState>,
    Path((schema_id, entity_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    let schema = ensure_schema_exists(&state, &schema_id).await?;
    if !state.repos.entities_for(&schema).delete_by_id(&entity_id).await? {
        return Err(CoreError::not_found("Entity", entity_id).into());
    }
    tracing::info!(entity_id = %entity_id, schema_id = %schema.id, "Entity deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// GET /schemas/{schema_id}/entities/{entity_id}/{attribute}
// ---------------------------------------------------------------------------

/// Read one relationship attribute: an entity or `null` for singular
/// cardinalities, an array for plural ones.
pub async fn get_relationship(
    State(state): State<AppState>,
    Path((schema_id, entity_id, attribute)): Path<(String, String, String)>,
) -> AppResult<impl IntoResponse> {
    let schema = ensure_schema_exists(&state, &schema_id).await?;
    let value = state
        .repos
        .entities_for(&schema)
        .get_relationship(&entity_id, &attribute)
        .await?;
    Ok(Json(ValueResponse { value }))
}

// ---------------------------------------------------------------------------
// PUT /schemas/{schema_id}/entities/{entity_id}/{attribute}
// ---------------------------------------------------------------------------

/// Replace one relationship attribute. The body must be an array for plural
/// cardinalities and an entity, id or `null` for singular ones.
pub async fn set_relationship(
    State(state): State<AppState>,
    Path((schema_id, entity_id, attribute)): Path<(String, String, String)>,
    AppJson(value): AppJson<Value>,
) -> AppResult<impl IntoResponse> {
    let schema = ensure_schema_exists(&state, &schema_id).await?;
    let value = state
        .repos
        .entities_for(&schema)
        .set_relationship(&entity_id, &attribute, &value)
        .await?;
    tracing::info!(
        entity_id = %entity_id,
        attribute = %attribute,
        "Relationship replaced"
    );
    Ok(Json(ValueResponse { value }))
}
