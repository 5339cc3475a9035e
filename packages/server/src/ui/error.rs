//! HTTP rendering of `ApiError`.

use axum::{
    Json,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::domain::{ApiError, LimitInfo};

fn status_of(err: &ApiError) -> StatusCode {
    match err {
        ApiError::UnknownError | ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ApiError::UserDoesNotExist
        | ApiError::ConversationDoesNotExist
        | ApiError::ResourceDoesNotExist => StatusCode::NOT_FOUND,
        ApiError::AccessDenied => StatusCode::FORBIDDEN,
        ApiError::RequestLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
        ApiError::AuthFailed => StatusCode::UNAUTHORIZED,
        ApiError::MessageTypeNotImplemented
        | ApiError::JsonFormat(_)
        | ApiError::InvalidValue(_)
        | ApiError::InvalidToken
        | ApiError::UnsupportedMethod
        | ApiError::InvalidMessageType => StatusCode::BAD_REQUEST,
    }
}

pub(crate) fn rate_limit_headers(info: &LimitInfo) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in [
        ("x-ratelimit-limit", info.limit),
        ("x-ratelimit-remaining", info.remaining),
        ("x-ratelimit-reset", info.reset_after),
        ("retry-after", info.retry_after),
    ] {
        headers.insert(HeaderName::from_static(name), HeaderValue::from(value));
    }
    headers
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_of(&self);
        if let ApiError::Database(detail) = &self {
            tracing::error!("Request failed on the backend: {}", detail);
        }
        let headers = self
            .limit_info()
            .map(|info| rate_limit_headers(&info))
            .unwrap_or_default();
        (status, headers, Json(self.to_body())).into_response()
    }
}
