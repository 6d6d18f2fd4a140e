//! App installation.
//!
//! [`InstallService`] drives one install attempt through its phases:
//!
//! ```text
//! Idle -> AwaitingAuthorization -> CallbackReceived -> Validated
//!      -> ExchangingToken -> Persisted -> Installed
//! ```
//!
//! Any check that fails moves the attempt to `Rejected`; nothing is stored
//! unless the token exchange succeeded.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::auth::oauth::{
    begin_auth, validate_auth_callback, AuthQuery, BeginAuthResult, OAuthError, StateNonce,
    TokenExchanger,
};
use crate::config::AppConfig;
use crate::store::{AccessToken, CredentialRecord, CredentialStore, Installation, StoreError};

/// Where an install attempt is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstallPhase {
    /// The merchant was redirected to the authorize page.
    AwaitingAuthorization,
    /// The platform redirected back to the callback.
    CallbackReceived,
    /// Parameters, state, HMAC and shop all checked out.
    Validated,
    /// The authorization code is being traded for a token.
    ExchangingToken,
    /// The credential was written to the store.
    Persisted,
    /// The install is complete.
    Installed,
    /// A check or a downstream call failed; nothing further happens.
    Rejected,
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AwaitingAuthorization => "awaiting_authorization",
            Self::CallbackReceived => "callback_received",
            Self::Validated => "validated",
            Self::ExchangingToken => "exchanging_token",
            Self::Persisted => "persisted",
            Self::Installed => "installed",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Why an install attempt ended in `Rejected`.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error(transparent)]
    OAuth(#[from] OAuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Runs installs against a token exchanger and a credential store.
#[derive(Clone)]
pub struct InstallService {
    config: Arc<AppConfig>,
    exchanger: Arc<dyn TokenExchanger>,
    store: Arc<dyn CredentialStore>,
}

impl InstallService {
    pub fn new(
        config: Arc<AppConfig>,
        exchanger: Arc<dyn TokenExchanger>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            config,
            exchanger,
            store,
        }
    }

    /// Starts an install for the `shop` query parameter.
    ///
    /// # Errors
    ///
    /// [`OAuthError::MissingShop`] or [`OAuthError::InvalidShop`].
    pub fn begin(&self, shop: Option<&str>) -> Result<BeginAuthResult, OAuthError> {
        let result = begin_auth(&self.config, shop).inspect_err(|e| {
            warn!(phase = %InstallPhase::Rejected, error = %e, "install request refused");
        })?;

        info!(
            shop = %result.shop,
            phase = %InstallPhase::AwaitingAuthorization,
            "redirecting to authorization"
        );
        Ok(result)
    }

    /// Completes an install from the callback query and the state cookie.
    ///
    /// Validates the callback, exchanges the code and upserts the credential,
    /// keeping any existing settings. Returns the stored record.
    ///
    /// # Errors
    ///
    /// - [`InstallError::OAuth`] for any validation or exchange failure; the
    ///   store is not touched
    /// - [`InstallError::Store`] if the credential could not be saved
    pub async fn complete(
        &self,
        query: &AuthQuery,
        cookie: Option<&StateNonce>,
        now: DateTime<Utc>,
    ) -> Result<CredentialRecord, InstallError> {
        info!(phase = %InstallPhase::CallbackReceived, "install callback received");

        let callback = validate_auth_callback(&self.config, query, cookie, now).inspect_err(|e| {
            if e.is_security_rejection() {
                warn!(phase = %InstallPhase::Rejected, error = %e, "install callback rejected");
            } else {
                info!(phase = %InstallPhase::Rejected, error = %e, "install callback rejected");
            }
        })?;
        info!(shop = %callback.shop, phase = %InstallPhase::Validated, "install callback verified");

        info!(shop = %callback.shop, phase = %InstallPhase::ExchangingToken, "exchanging code");
        let token = self
            .exchanger
            .exchange(&callback.shop, &callback.code)
            .await
            .inspect_err(|e| {
                warn!(shop = %callback.shop, phase = %InstallPhase::Rejected, error = %e, "token exchange failed");
            })?;

        if let Some(granted) = token.granted_scopes() {
            if !granted.covers(self.config.scopes()) {
                warn!(
                    shop = %callback.shop,
                    requested = %self.config.scopes(),
                    %granted,
                    "granted scopes do not cover requested scopes"
                );
            }
        }

        let installation = Installation {
            shop: callback.shop,
            access_token: AccessToken::new(token.access_token),
        };
        let record = self.store.save_installation(&installation).await.inspect_err(|e| {
            warn!(shop = %installation.shop, phase = %InstallPhase::Rejected, error = %e, "storing credential failed");
        })?;
        info!(shop = %installation.shop, phase = %InstallPhase::Persisted, "credential stored");

        info!(shop = %installation.shop, phase = %InstallPhase::Installed, "app installed");
        Ok(record)
    }
}
