//! Error taxonomy shared by every endpoint.
//!
//! Each variant carries a stable numeric code that clients switch on. The
//! wire message of a database failure is always generic; the detail is only
//! logged.

use serde::Serialize;
use thiserror::Error;

/// Rate-limit state reported with a rejection. All durations are whole
/// seconds, rounded up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitInfo {
    pub retry_after: u64,
    pub remaining: u64,
    pub limit: u64,
    pub reset_after: u64,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("An unknown error occured.")]
    UnknownError,
    #[error("The user does not exist.")]
    UserDoesNotExist,
    #[error("The message type is not implemented.")]
    MessageTypeNotImplemented,
    #[error("Access denied.")]
    AccessDenied,
    #[error("database failure: {0}")]
    Database(String),
    #[error("The conversation does not exist.")]
    ConversationDoesNotExist,
    #[error("Invalid JSON: {0}")]
    JsonFormat(String),
    #[error("Invalid value for field '{0}'.")]
    InvalidValue(String),
    #[error("The requested resource does not exist.")]
    ResourceDoesNotExist,
    #[error("The provided token is invalid.")]
    InvalidToken,
    #[error("The requested method is not supported.")]
    UnsupportedMethod,
    #[error("Too many requests.")]
    RequestLimitExceeded(LimitInfo),
    #[error("Authentication failed.")]
    AuthFailed,
    #[error("Invalid message type for this operation.")]
    InvalidMessageType,
}

impl ApiError {
    pub fn code(&self) -> u16 {
        match self {
            ApiError::UnknownError => 1000,
            ApiError::UserDoesNotExist => 1001,
            ApiError::MessageTypeNotImplemented => 1003,
            ApiError::AccessDenied => 1006,
            ApiError::Database(_) => 1008,
            ApiError::ConversationDoesNotExist => 1009,
            ApiError::JsonFormat(_) => 1010,
            ApiError::InvalidValue(_) => 1012,
            ApiError::ResourceDoesNotExist => 1013,
            ApiError::InvalidToken => 1016,
            ApiError::UnsupportedMethod => 1017,
            ApiError::RequestLimitExceeded(_) => 1019,
            ApiError::AuthFailed => 1020,
            ApiError::InvalidMessageType => 1024,
        }
    }

    /// Message sent to clients.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Database(_) => "Some unexpected error occured within the database.".into(),
            other => other.to_string(),
        }
    }

    pub fn limit_info(&self) -> Option<LimitInfo> {
        match self {
            ApiError::RequestLimitExceeded(info) => Some(*info),
            _ => None,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            message: self.public_message(),
            rate_limit: self.limit_info(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::JsonFormat(err.to_string())
    }
}

/// JSON body of an error, both in error frames and HTTP responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
    #[serde(rename = "rateLimit", skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<LimitInfo>,
}
