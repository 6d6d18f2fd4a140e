//! Configuration errors.
//!
//! Everything that builds or loads an [`AppConfig`](crate::AppConfig)
//! returns [`ConfigError`], so a misconfigured deployment stops at startup
//! rather than on the first install attempt.
//!
//! ```rust
//! use shopify_toc::{ApiKey, ConfigError};
//!
//! assert!(matches!(ApiKey::new(""), Err(ConfigError::EmptyApiKey)));
//! ```

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("SHOPIFY_API_KEY is empty; set it to the app's client id")]
    EmptyApiKey,

    #[error("SHOPIFY_API_SECRET is empty; set it to the app's client secret")]
    EmptyApiSecretKey,

    /// Not a `<label>` or `<label>.myshopify.com` host.
    #[error("'{domain}' is not a myshopify.com shop domain")]
    InvalidShopDomain { domain: String },

    /// Not `YYYY-MM` or `unstable`.
    #[error("'{version}' is not an Admin API version (expected YYYY-MM or 'unstable')")]
    InvalidApiVersion { version: String },

    #[error("Invalid scopes: {reason}")]
    InvalidScopes { reason: String },

    #[error("'{field}' must be set before the configuration can be built")]
    MissingRequiredField { field: &'static str },

    /// Not an absolute `http(s)` URL.
    #[error("'{url}' is not an absolute http(s) URL")]
    InvalidHostUrl { url: String },

    /// The environment could not be extracted into the configuration shape.
    #[error("Could not read configuration from the environment: {reason}")]
    Environment { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_errors_name_the_variable() {
        assert!(ConfigError::EmptyApiKey.to_string().contains("SHOPIFY_API_KEY"));
        assert!(ConfigError::EmptyApiSecretKey
            .to_string()
            .contains("SHOPIFY_API_SECRET"));
    }

    #[test]
    fn test_messages_echo_the_rejected_value() {
        let shop = ConfigError::InvalidShopDomain {
            domain: "evil.example.com".to_string(),
        };
        assert!(shop.to_string().contains("evil.example.com"));

        let missing = ConfigError::MissingRequiredField { field: "app_url" };
        assert!(missing.to_string().contains("app_url"));
    }

    #[test]
    fn test_environment_error_keeps_reason() {
        let error = ConfigError::Environment {
            reason: "missing field `shopify_api_key`".to_string(),
        };
        assert!(error.to_string().contains("shopify_api_key"));
    }
}
