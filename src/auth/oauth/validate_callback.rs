//! OAuth callback validation.
//!
//! [`validate_auth_callback`] runs every check that does not touch the
//! network, in a fixed order:
//!
//! 1. the four required parameters are present
//! 2. `state` matches the cookie nonce and is still fresh
//! 3. the HMAC over the query verifies with the API secret
//! 4. `shop` is a valid `myshopify.com` domain
//!
//! Only a callback that passes all four may proceed to the token exchange.

use chrono::{DateTime, Utc};

use crate::auth::oauth::hmac::verify_callback_hmac;
use crate::auth::oauth::state::{verify_state, StateNonce};
use crate::auth::oauth::{AuthQuery, OAuthError};
use crate::config::{AppConfig, ShopDomain};

/// A callback that passed validation and is ready for code exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidatedCallback {
    /// The shop that authorized the install.
    pub shop: ShopDomain,

    /// The single-use authorization code.
    pub code: String,
}

impl std::fmt::Debug for ValidatedCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatedCallback")
            .field("shop", &self.shop)
            .field("code", &"*****")
            .finish()
    }
}

/// Validates the callback query against the state cookie.
///
/// `cookie` is the nonce read back from the encrypted state cookie, or `None`
/// if the browser presented none.
///
/// # Errors
///
/// - [`OAuthError::MissingParameters`]: `shop`, `hmac`, `code` or `state` absent
/// - [`OAuthError::ForgerySuspected`]: state cookie missing, mismatched or stale
/// - [`OAuthError::SignatureMismatch`]: HMAC does not verify
/// - [`OAuthError::InvalidShop`]: `shop` is not a valid shop domain
pub fn validate_auth_callback(
    config: &AppConfig,
    query: &AuthQuery,
    cookie: Option<&StateNonce>,
    now: DateTime<Utc>,
) -> Result<ValidatedCallback, OAuthError> {
    let params = query.callback_params()?;

    verify_state(params.state, cookie, now, config.state_ttl())?;

    verify_callback_hmac(query, config.api_secret_key().as_ref())?;

    let shop = ShopDomain::new(params.shop).map_err(|_| OAuthError::InvalidShop {
        shop: params.shop.to_string(),
    })?;

    Ok(ValidatedCallback {
        shop,
        code: params.code.to_string(),
    })
}
