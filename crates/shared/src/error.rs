use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    Conflict,
    Internal,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => ErrorCode::Validation,
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            409 => ErrorCode::Conflict,
            _ => ErrorCode::Internal,
        }
    }
}

/// JSON body the backend attaches to non-2xx responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Error)]
#[error("{code:?} ({status}): {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub status: u16,
    pub message: String,
    pub field_errors: BTreeMap<String, String>,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::from_status(status),
            status,
            message: message.into(),
            field_errors: BTreeMap::new(),
        }
    }

    /// Builds an error from a raw response body, falling back to the body text
    /// when it is not the structured JSON shape.
    pub fn from_body(status: u16, raw_body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(raw_body) {
            Ok(body) => {
                let message = if body.message.is_empty() {
                    format!("request failed with status {status}")
                } else {
                    body.message
                };
                Self {
                    code: ErrorCode::from_status(status),
                    status,
                    message,
                    field_errors: body.errors,
                }
            }
            Err(_) => {
                let trimmed = raw_body.trim();
                let message = if trimmed.is_empty() {
                    format!("request failed with status {status}")
                } else {
                    trimmed.to_string()
                };
                Self::new(status, message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_structured_validation_body() {
        let err = ApiError::from_body(
            400,
            r#"{"status":400,"message":"Validation failed","errors":{"title":"Title must not be blank"}}"#,
        );
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(err.message, "Validation failed");
        assert_eq!(
            err.field_errors.get("title").map(String::as_str),
            Some("Title must not be blank")
        );
    }

    #[test]
    fn falls_back_to_plain_text_body() {
        let err = ApiError::from_body(502, "Bad Gateway\n");
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.message, "Bad Gateway");

        let empty = ApiError::from_body(404, "");
        assert_eq!(empty.code, ErrorCode::NotFound);
        assert_eq!(empty.message, "request failed with status 404");
    }
}
