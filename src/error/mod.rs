use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Form error: {0}")]
    Form(#[from] FormError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// The database cannot be opened or written at all (missing permissions,
    /// disk full, read-only media).
    #[error("Storage unavailable: {message}")]
    Unavailable { message: String },

    /// A single write did not commit.
    #[error("Transaction aborted: {message}")]
    TransactionAborted { message: String },

    #[error("Collection '{collection}' does not exist at schema version {version}")]
    CollectionMissing { collection: String, version: i64 },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("Corrupt record {id} in {collection}: {message}")]
    CorruptRecord {
        collection: String,
        id: String,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// SQLite result codes that mean the store itself is unusable rather than a
// single statement failing.
const SQLITE_PERM: &str = "3";
const SQLITE_READONLY: &str = "8";
const SQLITE_IOERR: &str = "10";
const SQLITE_FULL: &str = "13";
const SQLITE_CANTOPEN: &str = "14";

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Configuration(_) => StorageError::Unavailable {
                message: err.to_string(),
            },
            sqlx::Error::Database(db) => {
                let unavailable = db.code().is_some_and(|code| {
                    // Extended result codes keep the primary code in the low byte.
                    let primary = code
                        .parse::<i64>()
                        .map(|c| (c & 0xff).to_string())
                        .unwrap_or_else(|_| code.to_string());
                    matches!(
                        primary.as_str(),
                        SQLITE_PERM | SQLITE_READONLY | SQLITE_IOERR | SQLITE_FULL | SQLITE_CANTOPEN
                    )
                });
                if unavailable {
                    StorageError::Unavailable {
                        message: err.to_string(),
                    }
                } else {
                    StorageError::TransactionAborted {
                        message: err.to_string(),
                    }
                }
            }
            _ => StorageError::TransactionAborted {
                message: err.to_string(),
            },
        }
    }
}

/// Form catalog and traversal errors
#[derive(Debug, Error)]
pub enum FormError {
    #[error("{kind} not found: {form_id}")]
    NotFound { kind: String, form_id: String },

    #[error("Form '{form_id}' has no questions")]
    EmptyForm { form_id: String },

    #[error("Invalid form definition '{form_id}': {reason}")]
    InvalidDefinition { form_id: String, reason: String },

    #[error("Unknown question: {question_id}")]
    UnknownQuestion { question_id: String },

    #[error("Invalid answer for {question_id}: {reason}")]
    InvalidAnswer { question_id: String, reason: String },

    #[error("Form '{form_id}' is no longer accepting changes")]
    SessionClosed { form_id: String },

    #[error("Form '{form_id}' can only be submitted from its last question")]
    NotAtLastQuestion { form_id: String },

    #[error("Please fill in the following required fields: {}", .fields.join(", "))]
    MissingRequired { fields: Vec<String> },

    #[error("Failed to load catalog: {message}")]
    Catalog { message: String },
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for form operations
pub type FormResult<T> = Result<T, FormError>;
