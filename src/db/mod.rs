pub mod sqlite;
pub mod repository;
pub mod store;

pub use sqlite::*;
pub use repository::*;
pub use store::Store;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("Stored document is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cannot prepare database location: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage connection lock poisoned")]
    LockPoisoned,
}
