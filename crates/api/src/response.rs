//! Shared response envelope for API handlers.
//!
//! Successful responses wrap their payload as `{ "value": ... }`. Use
//! [`ValueResponse`] rather than ad-hoc `json!({ "value": ... })`.

use serde::Serialize;

/// Standard `{ "value": T }` response envelope.
///
/// ```ignore
/// Ok(Json(ValueResponse { value: schemas }))
/// ```
#[derive(Debug, Serialize)]
pub struct ValueResponse<T: Serialize> {
    pub value: T,
}
