use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use claims::ClaimError;
use ledger::LedgerError;
use privacy::PrivacyError;
use serde_json::json;
use store::StoreError;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found")]
    NotFound,

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Claim error: {0}")]
    Claim(#[from] ClaimError),

    #[error("Privacy error: {0}")]
    Privacy(#[from] PrivacyError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ServerError {
    /// Get HTTP status code for this error
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ServerError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Claim(err) => match err {
                ClaimError::ClaimNotFound(_) | ClaimError::ItemNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                ClaimError::Unauthorized(_) => StatusCode::FORBIDDEN,
                ClaimError::InvalidTransition { .. }
                | ClaimError::NotClaimable(_)
                | ClaimError::RaceLost(_) => StatusCode::CONFLICT,
                ClaimError::Store(err) => store_status(err),
            },
            ServerError::Privacy(err) => match err {
                PrivacyError::ItemNotFound(_)
                | PrivacyError::AssetMissing(_)
                | PrivacyError::AssetUnreadable(_) => StatusCode::NOT_FOUND,
                PrivacyError::Unauthorized(_) => StatusCode::FORBIDDEN,
                PrivacyError::Encrypt(_) | PrivacyError::Decrypt(_) | PrivacyError::Mask(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                PrivacyError::InvalidKey(_) => StatusCode::INTERNAL_SERVER_ERROR,
                PrivacyError::Store(err) => store_status(err),
            },
            ServerError::Ledger(LedgerError::Store(err)) => store_status(err),
            ServerError::Store(err) => store_status(err),
            ServerError::Internal(_) | ServerError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get error code string
    fn error_code(&self) -> &'static str {
        match self {
            ServerError::Authentication(_) => "AUTH_FAILED",
            ServerError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::NotFound => "NOT_FOUND",
            ServerError::Claim(err) => match err {
                ClaimError::ClaimNotFound(_) | ClaimError::ItemNotFound(_) => "NOT_FOUND",
                ClaimError::Unauthorized(_) => "UNAUTHORIZED",
                ClaimError::InvalidTransition { .. } => "INVALID_TRANSITION",
                ClaimError::NotClaimable(_) => "NOT_CLAIMABLE",
                ClaimError::RaceLost(_) => "RACE_LOST",
                ClaimError::Store(_) => "STORE_ERROR",
            },
            ServerError::Privacy(err) => match err {
                PrivacyError::ItemNotFound(_)
                | PrivacyError::AssetMissing(_)
                | PrivacyError::AssetUnreadable(_) => "NOT_FOUND",
                PrivacyError::Unauthorized(_) => "UNAUTHORIZED",
                PrivacyError::Encrypt(_) | PrivacyError::Decrypt(_) | PrivacyError::Mask(_) => {
                    "ASSET_ERROR"
                }
                PrivacyError::InvalidKey(_) => "CONFIG_ERROR",
                PrivacyError::Store(_) => "STORE_ERROR",
            },
            ServerError::Ledger(_) => "LEDGER_ERROR",
            ServerError::Store(_) => "STORE_ERROR",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Config(_) => "CONFIG_ERROR",
        }
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code().to_string();
        let message = self.to_string();

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<std::net::AddrParseError> for ServerError {
    fn from(err: std::net::AddrParseError) -> Self {
        ServerError::Config(format!("Invalid address: {err}"))
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(format!("IO error: {err}"))
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::BadRequest(format!("JSON parse error: {err}"))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::models::ClaimStatus;

    #[test]
    fn claim_errors_map_to_expected_statuses() {
        let invalid = ServerError::Claim(ClaimError::InvalidTransition {
            from: ClaimStatus::Completed,
            to: ClaimStatus::Approved,
        });
        assert_eq!(invalid.status_code(), StatusCode::CONFLICT);

        let unauthorized = ServerError::Claim(ClaimError::Unauthorized(5));
        assert_eq!(unauthorized.status_code(), StatusCode::FORBIDDEN);

        let missing = ServerError::Claim(ClaimError::ClaimNotFound(1));
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let race = ServerError::Claim(ClaimError::RaceLost(1));
        assert_eq!(race.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn privacy_errors_map_to_expected_statuses() {
        let unauthorized = ServerError::Privacy(PrivacyError::Unauthorized(5));
        assert_eq!(unauthorized.status_code(), StatusCode::FORBIDDEN);

        let mask = ServerError::Privacy(PrivacyError::Mask("decode failed".into()));
        assert_eq!(mask.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let missing = ServerError::Privacy(PrivacyError::AssetMissing(1));
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    }
}
