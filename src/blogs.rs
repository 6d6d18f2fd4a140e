//! Blog listing for the admin page.
//!
//! The admin page lets the merchant pick articles to exclude from the table
//! of contents, starting from the shop's blogs. The list is fetched from the
//! Admin REST API with the stored offline token and passed through as-is.
//! A body that is not JSON counts as an upstream failure.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{AppConfig, ShopDomain};
use crate::store::{CredentialStore, StoreError};

/// Header carrying the Admin API access token.
const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Errors from listing blogs.
#[derive(Debug, Error)]
pub enum BlogError {
    /// No shop has completed installation.
    #[error("App is not installed")]
    NotInstalled,

    /// The caller's session belongs to a different shop.
    #[error("Session shop {requested} does not match the installed shop")]
    ShopMismatch {
        /// Shop named by the caller's session.
        requested: ShopDomain,
    },

    /// The Admin API failed, timed out or answered with an error.
    #[error("Upstream unavailable{}: {message}", status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    UpstreamUnavailable {
        /// HTTP status, if a response arrived.
        status: Option<u16>,
        /// Error detail.
        message: String,
    },

    /// Storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Lists the installed shop's blogs.
#[derive(Clone)]
pub struct BlogService {
    client: reqwest::Client,
    config: Arc<AppConfig>,
    store: Arc<dyn CredentialStore>,
}

impl BlogService {
    pub fn new(
        client: reqwest::Client,
        config: Arc<AppConfig>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            client,
            config,
            store,
        }
    }

    /// Returns the Admin API's blog listing for the installed shop, unchanged.
    ///
    /// # Errors
    ///
    /// - [`BlogError::NotInstalled`] if no install has completed
    /// - [`BlogError::ShopMismatch`] if `requesting_shop` is not installed
    /// - [`BlogError::UpstreamUnavailable`] on network errors, timeouts,
    ///   non-2xx responses or an unexpected body
    pub async fn list(&self, requesting_shop: &ShopDomain) -> Result<Value, BlogError> {
        let installation = self
            .store
            .load()
            .await?
            .and_then(|record| record.installation)
            .ok_or(BlogError::NotInstalled)?;

        if &installation.shop != requesting_shop {
            return Err(BlogError::ShopMismatch {
                requested: requesting_shop.clone(),
            });
        }

        let url = format!(
            "{}/admin/api/{}/blogs.json",
            self.config.shop_origin(&installation.shop),
            self.config.api_version()
        );
        debug!(shop = %installation.shop, %url, "listing blogs");

        let response = self
            .client
            .get(&url)
            .header(ACCESS_TOKEN_HEADER, installation.access_token.as_ref())
            .timeout(self.config.upstream_timeout())
            .send()
            .await
            .map_err(|e| {
                warn!(shop = %installation.shop, error = %e, "blog listing request failed");
                BlogError::UpstreamUnavailable {
                    status: None,
                    message: if e.is_timeout() {
                        "request timed out".to_string()
                    } else {
                        format!("network error: {e}")
                    },
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(shop = %installation.shop, status = status.as_u16(), "blog listing rejected");
            return Err(BlogError::UpstreamUnavailable {
                status: Some(status.as_u16()),
                message: body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| BlogError::UpstreamUnavailable {
                status: Some(status.as_u16()),
                message: format!("failed to parse blogs response: {e}"),
            })
    }
}
