//! Result and error types for the core library

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    /// Backend answered with a non-2xx status
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    /// 401 from the backend; the stored token is no longer valid
    #[error("Unauthorized: please login again")]
    Unauthorized,

    #[error("Your session has expired. Please login again.")]
    SessionExpired,

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Balance is not enough: available {available}, requested {requested}")]
    InsufficientFunds { available: Decimal, requested: Decimal },

    #[error("A submission with key {0} was already made")]
    DuplicateSubmission(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an API error
    pub fn api(status: u16, msg: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: msg.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// True when the session must be discarded (401 or expiry)
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::SessionExpired)
    }

    /// True when a request may have reached the backend without an answer
    /// coming back, so a money command may or may not have been applied
    pub fn is_outcome_unknown(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Short title for the alert banner shown to the user
    pub fn title(&self) -> &'static str {
        match self {
            Self::Api { .. } => "Request failed",
            Self::Network(_) => "Connection problem",
            Self::Unauthorized | Self::SessionExpired | Self::NotAuthenticated => "Session",
            Self::Validation(_) => "Invalid input",
            Self::InsufficientFunds { .. } => "Insufficient balance",
            Self::DuplicateSubmission(_) => "Already submitted",
            Self::NotFound(_) => "Not found",
            _ => "Error",
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of a wallet command, returned instead of thrown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a successful result with context
    pub fn ok_with_context(data: T, context: HashMap<String, serde_json::Value>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: Some(context),
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }

    /// Create a failed result with context
    pub fn fail_with_context(
        error: impl Into<String>,
        context: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: Some(context),
        }
    }

    /// Create a failed result that still carries data (e.g. the failed transaction)
    pub fn fail_with_data(error: impl Into<String>, data: T) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(error.into()),
            context: None,
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(e.to_string()),
        }
    }
}
