//! Handler for dry-run entity validation, plus the check shared by every
//! entity write.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

use entistore_core::entity::Entity;
use entistore_core::error::CoreError;
use entistore_core::schema::Schema;
use entistore_core::validation::validate;

use super::ensure_schema_exists;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::response::ValueResponse;
use crate::state::AppState;

/// PUT /schemas/{schema_id}/validate -- evaluate a candidate entity without
/// storing it. Always 200; the verdict is in the body.
pub async fn validate_entity(
    State(state): State<AppState>,
    Path(schema_id): Path<String>,
    AppJson(entity): AppJson<Entity>,
) -> AppResult<impl IntoResponse> {
    let schema = ensure_schema_exists(&state, &schema_id).await?;
    let result = validate(&schema, &entity);
    tracing::debug!(schema_id = %schema.id, valid = result.valid, "Validated entity");
    Ok(Json(ValueResponse { value: result }))
}

/// Reject an invalid entity before anything is persisted.
pub(crate) fn ensure_valid(schema: &Schema, entity: &Entity) -> Result<(), CoreError> {
    let result = validate(schema, entity);
    if result.valid {
        return Ok(());
    }

    match result.message.clone() {
        Some(message) => Err(CoreError::Validation(message)),
        None => Err(CoreError::InvalidFields {
            message: "Validation has failed".to_string(),
            details: result.field_messages(),
        }),
    }
}
