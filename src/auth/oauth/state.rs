//! State nonce handling for OAuth CSRF protection.
//!
//! An install attempt is bound to its callback by a random nonce that travels
//! twice: once as the `state` query parameter through Shopify, and once as an
//! encrypted browser cookie. The callback is accepted only when both copies
//! agree and the nonce is still inside its validity window.
//!
//! Nothing is stored server-side; the issue time rides along in the cookie,
//! which the HTTP layer encrypts so it cannot be altered.
//!
//! ```rust
//! use shopify_toc::auth::oauth::{verify_state, StateNonce};
//! use std::time::Duration;
//!
//! let nonce = StateNonce::issue();
//! let cookie = StateNonce::from_cookie_value(&nonce.to_cookie_value()).unwrap();
//!
//! let now = chrono::Utc::now();
//! assert!(verify_state(nonce.value(), Some(&cookie), now, Duration::from_secs(600)).is_ok());
//! assert!(verify_state("forged", Some(&cookie), now, Duration::from_secs(600)).is_err());
//! ```

use crate::auth::oauth::hmac::constant_time_compare;
use crate::auth::oauth::OAuthError;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fmt;
use std::time::Duration;

/// A one-time anti-forgery token bound to a pending installation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateNonce {
    value: String,
    issued_at: DateTime<Utc>,
}

impl StateNonce {
    /// Length of generated nonces.
    pub const NONCE_LENGTH: usize = 32;

    /// Generates a fresh nonce issued now.
    #[must_use]
    pub fn issue() -> Self {
        Self::issue_at(Utc::now())
    }

    /// Generates a fresh nonce with an explicit issue time.
    ///
    /// The value is alphanumeric and drawn from the thread-local CSPRNG.
    #[must_use]
    pub fn issue_at(issued_at: DateTime<Utc>) -> Self {
        let value: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(Self::NONCE_LENGTH)
            .map(char::from)
            .collect();

        Self { value, issued_at }
    }

    /// Returns the nonce string sent as the `state` parameter.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns when the nonce was issued.
    #[must_use]
    pub const fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Serializes the nonce and its issue time for the state cookie.
    ///
    /// Format: `{nonce}.{unix seconds}`.
    #[must_use]
    pub fn to_cookie_value(&self) -> String {
        format!("{}.{}", self.value, self.issued_at.timestamp())
    }

    /// Parses a value produced by [`StateNonce::to_cookie_value`].
    ///
    /// Returns `None` for anything malformed.
    #[must_use]
    pub fn from_cookie_value(raw: &str) -> Option<Self> {
        let (value, issued) = raw.rsplit_once('.')?;
        if value.is_empty() || !value.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        let issued_at = DateTime::from_timestamp(issued.parse().ok()?, 0)?;

        Some(Self {
            value: value.to_string(),
            issued_at,
        })
    }
}

impl fmt::Display for StateNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl AsRef<str> for StateNonce {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

/// Verifies a callback's `state` against the nonce read back from the cookie.
///
/// # Errors
///
/// Returns [`OAuthError::ForgerySuspected`] when the cookie is absent, the
/// values differ, or the nonce is older than `ttl`.
pub fn verify_state(
    received: &str,
    cookie: Option<&StateNonce>,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Result<(), OAuthError> {
    let Some(expected) = cookie else {
        return Err(OAuthError::ForgerySuspected {
            reason: "state cookie missing".to_string(),
        });
    };

    if !constant_time_compare(received, expected.value()) {
        return Err(OAuthError::ForgerySuspected {
            reason: "state does not match cookie".to_string(),
        });
    }

    // A negative age means the clocks disagree; the cookie is authenticated,
    // so only an age beyond the window is treated as stale.
    if let Ok(age) = (now - expected.issued_at).to_std() {
        if age > ttl {
            return Err(OAuthError::ForgerySuspected {
                reason: format!("state expired {}s after issue", age.as_secs()),
            });
        }
    }

    Ok(())
}

const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<StateNonce>();
};
