//! App Bridge session tokens.
//!
//! When the app's admin page runs inside the Shopify admin, App Bridge signs
//! a short-lived JWT with the app's API secret. Sending it as
//! `Authorization: Bearer <token>` is what authorizes access to the full
//! credential record and the blog listing.
//!
//! # Claims
//!
//! - `iss`: issuer, e.g. `https://shop.myshopify.com/admin`
//! - `dest`: the shop, e.g. `https://shop.myshopify.com`
//! - `aud`: must equal the app's API key
//! - `sub`: user id, optional
//! - `exp`, `nbf`, `iat`: validated with a 10 second leeway
//! - `jti`: unique token id
//! - `sid`: session id, optional

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;

use crate::config::{AppConfig, ShopDomain};

const JWT_LEEWAY_SECS: u64 = 10;

/// Why a session token was refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionTokenError {
    /// No bearer token was presented.
    #[error("Missing session token")]
    Missing,

    /// The token did not decode, verify or carry the expected claims.
    #[error("Invalid session token: {reason}")]
    Invalid {
        /// What failed.
        reason: String,
    },
}

/// Decoded claims of a verified session token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionToken {
    /// Issuer, the shop's admin URL.
    pub iss: String,

    /// Destination shop URL.
    pub dest: String,

    /// Audience; the app's API key.
    pub aud: String,

    /// Subject, the admin user id when present.
    pub sub: Option<String>,

    /// Expiration (Unix seconds).
    pub exp: i64,

    /// Not before (Unix seconds).
    pub nbf: i64,

    /// Issued at (Unix seconds).
    pub iat: i64,

    /// Token id.
    pub jti: String,

    /// Session id.
    pub sid: Option<String>,
}

impl SessionToken {
    /// Decodes `token` and verifies signature, time claims and audience.
    ///
    /// # Errors
    ///
    /// Returns [`SessionTokenError::Invalid`] if the signature does not verify
    /// with the API secret, the token is expired or not yet valid, `aud` is
    /// not the API key, or `dest` is not a shop domain.
    pub fn decode(token: &str, config: &AppConfig) -> Result<Self, SessionTokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = JWT_LEEWAY_SECS;
        validation.validate_nbf = true;
        validation.validate_aud = false;

        let key = DecodingKey::from_secret(config.api_secret_key().as_ref().as_bytes());
        let claims = decode::<Self>(token, &key, &validation)
            .map_err(|e| SessionTokenError::Invalid {
                reason: format!("error decoding session token: {e}"),
            })?
            .claims;

        if claims.aud != config.api_key().as_ref() {
            return Err(SessionTokenError::Invalid {
                reason: "session token had invalid API key".to_string(),
            });
        }

        claims.shop()?;
        Ok(claims)
    }

    /// Returns the shop named by the `dest` claim.
    ///
    /// # Errors
    ///
    /// Returns [`SessionTokenError::Invalid`] if `dest` is not a shop URL.
    pub fn shop(&self) -> Result<ShopDomain, SessionTokenError> {
        let host = self.dest.strip_prefix("https://").unwrap_or(&self.dest);
        ShopDomain::new(host).map_err(|_| SessionTokenError::Invalid {
            reason: format!("session token destination '{}' is not a shop", self.dest),
        })
    }
}

const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SessionToken>();
};
