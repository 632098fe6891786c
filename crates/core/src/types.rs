/// Schema and entity identifiers are opaque text.
///
/// Stores generate them as UUID v4 strings, but callers must never rely on
/// the format: any string a client sends is looked up as-is.
pub type DbId = String;

/// Generate a fresh identifier for a new schema or entity.
pub fn new_id() -> DbId {
    uuid::Uuid::new_v4().to_string()
}
