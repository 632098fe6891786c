//! Handlers for schema CRUD.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use entistore_core::error::CoreError;
use entistore_core::schema::{check_attributes, CreateSchema, UpdateSchema};
use entistore_core::types::new_id;

use super::ensure_schema_exists;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::response::ValueResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /schemas
// ---------------------------------------------------------------------------

pub async fn list_schemas(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let schemas = state.repos.schemas.find_all().await?;
    tracing::debug!(count = schemas.len(), "Listed schemas");
    Ok(Json(ValueResponse { value: schemas }))
}

// ---------------------------------------------------------------------------
// POST /schemas
// ---------------------------------------------------------------------------

/// Create a schema under a server-assigned id.
pub async fn create_schema(
    State(state): State<AppState>,
    AppJson(input): AppJson<CreateSchema>,
) -> AppResult<impl IntoResponse> {
    check_attributes(&input.attributes)?;

    let created = state.repos.schemas.create(input.into_schema(new_id())).await?;
    tracing::info!(schema_id = %created.id, display = %created.display, "Schema created");
    Ok((StatusCode::CREATED, Json(ValueResponse { value: created })))
}

// ---------------------------------------------------------------------------
// GET /schemas/{schema_id}
// ---------------------------------------------------------------------------

pub async fn get_schema(
    State(state): State<AppState>,
    Path(schema_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let schema = ensure_schema_exists(&state, &schema_id).await?;
    Ok(Json(ValueResponse { value: schema }))
}

// ---------------------------------------------------------------------------
// PUT /schemas/{schema_id}
// ---------------------------------------------------------------------------

/// Update display fields and/or replace the attribute list.
///
/// Entities already stored are not revalidated against the new definition.
pub async fn update_schema(
    State(state): State<AppState>,
    Path(schema_id): Path<String>,
    AppJson(input): AppJson<UpdateSchema>,
) -> AppResult<impl IntoResponse> {
    let mut schema = ensure_schema_exists(&state, &schema_id).await?;
    input.apply_to(&mut schema);
    check_attributes(&schema.attributes)?;

    let updated = state
        .repos
        .schemas
        .update(schema)
        .await?
        .ok_or_else(|| CoreError::not_found("Schema", &schema_id))?;
    tracing::info!(schema_id = %updated.id, "Schema updated");
    Ok(Json(ValueResponse { value: updated }))
}

// ---------------------------------------------------------------------------
// DELETE /schemas/{schema_id}
// ---------------------------------------------------------------------------

/// Delete a schema together with its entities and their edges.
pub async fn delete_schema(
    State(state): State<AppState>,
    Path(schema_id): Path<String>,
) -> AppResult<StatusCode> {
    if !state.repos.schemas.delete_by_id(&schema_id).await? {
        return Err(CoreError::not_found("Schema", schema_id).into());
    }
    tracing::info!(schema_id = %schema_id, "Schema deleted");
    Ok(StatusCode::NO_CONTENT)
}
