pub mod entities;
pub mod schemas;
pub mod validation;

use entistore_core::error::CoreError;
use entistore_core::schema::Schema;

use crate::error::AppResult;
use crate::state::AppState;

/// Load a schema by id, or fail with 404.
pub(crate) async fn ensure_schema_exists(state: &AppState, id: &str) -> AppResult<Schema> {
    state
        .repos
        .schemas
        .find_by_id(id)
        .await?
        .ok_or_else(|| CoreError::not_found("Schema", id).into())
}
