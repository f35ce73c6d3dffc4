use crate::error::Error;
use crate::fetch::FetchContext;
use axum::Json;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Remaining caller budget in milliseconds, forwarded on every RPC hop.
pub const DEADLINE_HEADER: &str = "x-deadline-ms";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "Level")]
    pub level: String,
    #[serde(rename = "Error")]
    pub error: String,
}

impl ErrorBody {
    fn new(level: &str, error: &str) -> Self {
        ErrorBody {
            level: level.to_string(),
            error: error.to_string(),
        }
    }
}

/// Maps crate errors onto HTTP responses. Internal detail stays in the logs.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidLimit(_) => StatusCode::BAD_REQUEST,
            e if e.is_rate_limited() => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match status {
            StatusCode::BAD_REQUEST => ErrorBody::new("request", "invalid limit value"),
            StatusCode::TOO_MANY_REQUESTS => ErrorBody::new("upstream", "rate limit exceeded"),
            _ => {
                tracing::error!("Request failed: {}", self.0);
                ErrorBody::new("system", "internal server error")
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Builds the handler's context from the caller's deadline header, if any.
pub fn context_from_headers(headers: &HeaderMap) -> FetchContext {
    let budget = headers
        .get(DEADLINE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    match budget {
        Some(ms) => FetchContext::new().with_timeout(Duration::from_millis(ms)),
        None => FetchContext::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn errors_map_to_status_codes() {
        assert_eq!(ApiError(Error::InvalidLimit("x".into())).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError(Error::RateLimitExceeded { key: "k".into() }).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError(Error::RpcError { status: 429, message: String::new() }).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(ApiError(Error::Canceled).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn error_body_uses_capitalised_keys() {
        let json = serde_json::to_value(ErrorBody::new("system", "internal server error")).unwrap();
        assert_eq!(json, serde_json::json!({"Level": "system", "Error": "internal server error"}));
    }

    #[tokio::test]
    async fn deadline_header_bounds_the_context() {
        let mut headers = HeaderMap::new();
        headers.insert(DEADLINE_HEADER, HeaderValue::from_static("1500"));

        let remaining = context_from_headers(&headers).remaining().unwrap();
        assert!(remaining <= Duration::from_millis(1500));

        headers.insert(DEADLINE_HEADER, HeaderValue::from_static("soon"));
        assert!(context_from_headers(&headers).deadline().is_none());
    }
}
