//! HTTP error responses.
//!
//! Every failure leaves the server as `{"error": {"code", "message"}}` with
//! the status mapped below. Internal details of storage failures are logged,
//! not returned.
//!
//! | Error                     | Status |
//! |---------------------------|--------|
//! | missing/invalid input     | 400    |
//! | signature mismatch        | 400    |
//! | bad or missing session    | 401    |
//! | forgery, shop mismatch    | 403    |
//! | not installed             | 404    |
//! | persistence               | 500    |
//! | upstream / token exchange | 502    |

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::auth::oauth::OAuthError;
use crate::auth::SessionTokenError;
use crate::blogs::BlogError;
use crate::install::InstallError;
use crate::settings::SettingsError;
use crate::store::StoreError;

/// Errors surfaced by request handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    OAuth(#[from] OAuthError),

    #[error(transparent)]
    Persistence(#[from] StoreError),

    #[error("{0}")]
    InvalidSettings(String),

    #[error("App is not installed")]
    NotInstalled,

    #[error(transparent)]
    Unauthorized(#[from] SessionTokenError),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    UpstreamUnavailable(String),
}

impl From<InstallError> for AppError {
    fn from(err: InstallError) -> Self {
        match err {
            InstallError::OAuth(e) => Self::OAuth(e),
            InstallError::Store(e) => Self::Persistence(e),
        }
    }
}

impl From<SettingsError> for AppError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::Invalid { reason } => Self::InvalidSettings(reason),
            SettingsError::NotInstalled => Self::NotInstalled,
            e @ SettingsError::ShopMismatch { .. } => Self::Forbidden(e.to_string()),
            SettingsError::Store(e) => Self::Persistence(e),
        }
    }
}

impl From<BlogError> for AppError {
    fn from(err: BlogError) -> Self {
        match err {
            BlogError::NotInstalled => Self::NotInstalled,
            e @ BlogError::ShopMismatch { .. } => Self::Forbidden(e.to_string()),
            e @ BlogError::UpstreamUnavailable { .. } => Self::UpstreamUnavailable(e.to_string()),
            BlogError::Store(e) => Self::Persistence(e),
        }
    }
}

impl AppError {
    /// Status code and stable error code for this error.
    #[must_use]
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::OAuth(e) => match e {
                OAuthError::MissingShop => (StatusCode::BAD_REQUEST, "MISSING_SHOP"),
                OAuthError::InvalidShop { .. } => (StatusCode::BAD_REQUEST, "INVALID_SHOP"),
                OAuthError::MissingParameters { .. } => {
                    (StatusCode::BAD_REQUEST, "MISSING_PARAMETERS")
                }
                OAuthError::ForgerySuspected { .. } => (StatusCode::FORBIDDEN, "FORGERY_SUSPECTED"),
                OAuthError::SignatureMismatch => (StatusCode::BAD_REQUEST, "SIGNATURE_MISMATCH"),
                OAuthError::TokenExchangeFailed { .. } => {
                    (StatusCode::BAD_GATEWAY, "TOKEN_EXCHANGE_FAILED")
                }
            },
            Self::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR"),
            Self::InvalidSettings(_) => (StatusCode::BAD_REQUEST, "INVALID_SETTINGS"),
            Self::NotInstalled => (StatusCode::NOT_FOUND, "NOT_INSTALLED"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::UpstreamUnavailable(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_UNAVAILABLE"),
        }
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Persistence(e) => {
                error!(error = %e, "persistence failure");
                "An internal server error occurred.".to_string()
            }
            Self::OAuth(e) if e.is_security_rejection() => {
                warn!(error = %e, "request rejected");
                e.to_string()
            }
            e if status.is_server_error() => {
                warn!(error = %e, "upstream failure");
                e.to_string()
            }
            e => {
                debug!(error = %e, "client error");
                e.to_string()
            }
        };

        let body = ApiErrorBody {
            code: code.to_string(),
            message,
        };
        (status, Json(ApiErrorResponse { error: body })).into_response()
    }
}
