//! Error types for resurface operations.
//!
//! Errors carry a structured [`ErrorCode`] for programmatic handling and an
//! optional suggestion for the caller. Storage failures keep their underlying
//! cause as the error source.

use thiserror::Error;

/// Result type alias for resurface operations.
pub type ResurfaceResult<T> = Result<T, ResurfaceError>;

/// Main error type for all resurface operations.
#[derive(Error, Debug)]
pub enum ResurfaceError {
    /// No current user could be resolved for the request.
    #[error("Unauthenticated: {message}")]
    Unauthenticated { message: String, code: ErrorCode },

    /// A requested resource does not exist (or the user has no memos).
    #[error("Not found: {message}")]
    NotFound { message: String, code: ErrorCode },

    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        suggestion: Option<String>,
    },

    /// Storage operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Parse error.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Authentication (AUTH_xxx)
    AuthMissingUser,
    AuthInvalidUser,

    // Not found (NF_xxx)
    NotFoundMemo,
    NotFoundNoMemos,

    // Validation (VAL_xxx)
    ValInvalidInput,
    ValOutOfRange,

    // Database (DB_xxx)
    DbConnectionFailed,
    DbOperationFailed,

    // Parse (PARSE_xxx)
    ParseInvalidName,
    ParseInvalidValue,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthMissingUser => "AUTH_001",
            ErrorCode::AuthInvalidUser => "AUTH_002",
            ErrorCode::NotFoundMemo => "NF_001",
            ErrorCode::NotFoundNoMemos => "NF_002",
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValOutOfRange => "VAL_002",
            ErrorCode::DbConnectionFailed => "DB_001",
            ErrorCode::DbOperationFailed => "DB_002",
            ErrorCode::ParseInvalidName => "PARSE_001",
            ErrorCode::ParseInvalidValue => "PARSE_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl ResurfaceError {
    /// Create an unauthenticated error.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
            code: ErrorCode::AuthMissingUser,
        }
    }

    /// Create a not found error for a single memo.
    pub fn memo_not_found(memo_id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            message: format!("Memo '{}' not found", memo_id),
            code: ErrorCode::NotFoundMemo,
        }
    }

    /// Create a not found error for a user without any memos.
    pub fn no_memos() -> Self {
        Self::NotFound {
            message: "no memos found".to_string(),
            code: ErrorCode::NotFoundNoMemos,
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            suggestion: None,
        }
    }

    /// Create a validation error with suggestion.
    pub fn validation_with_suggestion(
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValOutOfRange,
            suggestion: Some(suggestion.into()),
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Create a parse error for an invalid resource name.
    pub fn invalid_name(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidName,
        }
    }

    /// Create a parse error for an invalid value.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidValue,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Unauthenticated { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::Database { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Unauthenticated { .. } => Some("Please sign in or provide a user identity"),
            Self::NotFound { .. } => Some("Create some memos first, or check the memo name"),
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::Database { .. } => Some("Please check the database path and permissions"),
            _ => None,
        }
    }

    /// Whether this error is a not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<rusqlite::Error> for ResurfaceError {
    fn from(err: rusqlite::Error) -> Self {
        let code = match err {
            rusqlite::Error::SqliteFailure(ref e, _)
                if e.code == rusqlite::ErrorCode::CannotOpen =>
            {
                ErrorCode::DbConnectionFailed
            }
            _ => ErrorCode::DbOperationFailed,
        };
        Self::Database {
            message: err.to_string(),
            code,
            source: Some(Box::new(err)),
        }
    }
}
