use entistore_core::error::CoreError;

/// Error type shared by every storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A domain-level rejection raised while resolving a read or write.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// An edge write named a head entity that is not stored.
    #[error("Relationship {name} of {tail} points at missing entity {head}")]
    DanglingEdge {
        tail: String,
        name: String,
        head: String,
    },

    /// The database URL names a scheme no backend understands.
    #[error("Unsupported repository protocol: {0}")]
    UnsupportedProtocol(String),
}
