use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

use crate::validation::ValidationErrors;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not signed in; log in to use admin operations")]
    NotAuthenticated,
    #[error("invalid admin credentials")]
    InvalidCredentials,
    #[error("admin session expired; log in again")]
    SessionExpired,
    #[error("backend rejected request: {0}")]
    Api(#[from] ApiError),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid backend url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
    #[error("session storage failed: {0}")]
    SessionStorage(anyhow::Error),
}

impl ClientError {
    /// True when the operator has to go back through login before retrying.
    pub fn requires_reauth(&self) -> bool {
        matches!(
            self,
            ClientError::NotAuthenticated
                | ClientError::InvalidCredentials
                | ClientError::SessionExpired
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Api(err) if err.code == ErrorCode::NotFound)
    }
}
