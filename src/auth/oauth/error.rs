//! OAuth-specific error types.
//!
//! Variants fall into three groups:
//!
//! - client input: [`OAuthError::MissingShop`], [`OAuthError::MissingParameters`],
//!   [`OAuthError::InvalidShop`]
//! - security rejections: [`OAuthError::ForgerySuspected`],
//!   [`OAuthError::SignatureMismatch`]
//! - upstream failures: [`OAuthError::TokenExchangeFailed`]
//!
//! ```rust
//! use shopify_toc::auth::oauth::OAuthError;
//!
//! let error = OAuthError::SignatureMismatch;
//! assert_eq!(error.to_string(), "HMAC signature validation failed");
//! assert!(error.is_security_rejection());
//! ```

use thiserror::Error;

/// Errors that can occur while installing the app.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OAuthError {
    /// The install request carried no `shop` parameter.
    #[error("Missing shop parameter")]
    MissingShop,

    /// The `shop` parameter is not a valid shop domain.
    #[error("Invalid shop domain '{shop}'")]
    InvalidShop {
        /// The rejected value.
        shop: String,
    },

    /// One or more required callback parameters are absent or empty.
    #[error("Required parameters missing: {}", missing.join(", "))]
    MissingParameters {
        /// Names of the missing parameters.
        missing: Vec<&'static str>,
    },

    /// The callback's `state` could not be tied to an install started here.
    ///
    /// Raised when the state cookie is missing, does not match the `state`
    /// query parameter, or was issued outside the validity window.
    #[error("Request origin cannot be verified: {reason}")]
    ForgerySuspected {
        /// Why the state was rejected.
        reason: String,
    },

    /// The callback's `hmac` does not match the recomputed signature.
    #[error("HMAC signature validation failed")]
    SignatureMismatch,

    /// Exchanging the authorization code for an access token failed.
    ///
    /// `status` is `None` for network errors and timeouts.
    #[error("Token exchange failed{}: {message}", status.map(|s| format!(" with status {s}")).unwrap_or_default())]
    TokenExchangeFailed {
        /// HTTP status returned by the platform, if any.
        status: Option<u16>,
        /// Error detail.
        message: String,
    },
}

impl OAuthError {
    /// Returns `true` for anti-forgery and signature rejections.
    #[must_use]
    pub const fn is_security_rejection(&self) -> bool {
        matches!(self, Self::ForgerySuspected { .. } | Self::SignatureMismatch)
    }
}

const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<OAuthError>();
};
