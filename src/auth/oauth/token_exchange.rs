//! Authorization code exchange.
//!
//! The `ExchangingToken` step POSTs the code to the shop's
//! `/admin/oauth/access_token` endpoint. [`TokenExchanger`] is the seam the
//! install flow depends on; [`HttpTokenExchanger`] is the real implementation.
//!
//! Every request carries the configured timeout. Network errors and 5xx
//! responses are retried with exponential backoff up to the configured number
//! of extra attempts; 4xx responses fail immediately.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::oauth::OAuthError;
use crate::auth::AuthScopes;
use crate::config::{AppConfig, ShopDomain};

/// Successful token endpoint response.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct AccessTokenResponse {
    /// The offline access token.
    pub access_token: String,

    /// Comma-separated scopes actually granted.
    #[serde(default)]
    pub scope: Option<String>,
}

impl AccessTokenResponse {
    /// Parses the granted scopes, if the platform reported them.
    #[must_use]
    pub fn granted_scopes(&self) -> Option<AuthScopes> {
        self.scope.as_deref().and_then(|s| s.parse().ok())
    }
}

impl std::fmt::Debug for AccessTokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenResponse")
            .field("access_token", &"*****")
            .field("scope", &self.scope)
            .finish()
    }
}

/// Exchanges an authorization code for an access token.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Performs the exchange for `shop`.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::TokenExchangeFailed`] for any failure; nothing
    /// may be persisted by the caller in that case.
    async fn exchange(&self, shop: &ShopDomain, code: &str) -> Result<AccessTokenResponse, OAuthError>;
}

#[derive(Serialize)]
struct TokenExchangeRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
}

/// [`TokenExchanger`] backed by `reqwest`.
#[derive(Clone, Debug)]
pub struct HttpTokenExchanger {
    client: reqwest::Client,
    config: Arc<AppConfig>,
    retry_policy: ExponentialBuilder,
}

impl HttpTokenExchanger {
    /// Creates an exchanger using `client` for outbound requests.
    ///
    /// The configured upstream timeout is applied per request, so `client`
    /// may be shared with other platform calls.
    #[must_use]
    pub fn new(client: reqwest::Client, config: Arc<AppConfig>) -> Self {
        let retry_policy = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(config.token_exchange_retries())
            .with_jitter();

        Self {
            client,
            config,
            retry_policy,
        }
    }

    async fn attempt(&self, url: &str, code: &str) -> Result<AccessTokenResponse, OAuthError> {
        let body = TokenExchangeRequest {
            client_id: self.config.api_key().as_ref(),
            client_secret: self.config.api_secret_key().as_ref(),
            code,
        };

        let response = self
            .client
            .post(url)
            .timeout(self.config.upstream_timeout())
            .json(&body)
            .send()
            .await
            .map_err(|e| OAuthError::TokenExchangeFailed {
                status: None,
                message: if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    format!("network error: {e}")
                },
            })?;

        let status = response.status().as_u16();

        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(OAuthError::TokenExchangeFailed {
                status: Some(status),
                message: error_body,
            });
        }

        let token: AccessTokenResponse =
            response
                .json()
                .await
                .map_err(|e| OAuthError::TokenExchangeFailed {
                    status: Some(status),
                    message: format!("failed to parse token response: {e}"),
                })?;

        if token.access_token.is_empty() {
            return Err(OAuthError::TokenExchangeFailed {
                status: Some(status),
                message: "token response carried an empty access_token".to_string(),
            });
        }

        Ok(token)
    }
}

fn is_retryable(err: &OAuthError) -> bool {
    match err {
        OAuthError::TokenExchangeFailed { status: None, .. } => true,
        OAuthError::TokenExchangeFailed {
            status: Some(status),
            ..
        } => *status >= 500,
        _ => false,
    }
}

#[async_trait]
impl TokenExchanger for HttpTokenExchanger {
    async fn exchange(&self, shop: &ShopDomain, code: &str) -> Result<AccessTokenResponse, OAuthError> {
        let url = format!("{}/admin/oauth/access_token", self.config.shop_origin(shop));
        debug!(shop = %shop, "exchanging authorization code");

        (|| async { self.attempt(&url, code).await })
            .retry(self.retry_policy)
            .when(is_retryable)
            .notify(|err, delay| {
                warn!(shop = %shop, error = %err, ?delay, "token exchange failed, retrying");
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiKey, ApiSecretKey, HostUrl};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn exchanger_for(server: &MockServer, retries: usize) -> HttpTokenExchanger {
        let config = AppConfig::builder()
            .api_key(ApiKey::new("test-api-key").unwrap())
            .api_secret_key(ApiSecretKey::new("test-secret").unwrap())
            .app_url(HostUrl::new("https://toc.example.com").unwrap())
            .admin_origin(HostUrl::new(server.uri()).unwrap())
            .upstream_timeout(Duration::from_millis(500))
            .token_exchange_retries(retries)
            .build()
            .unwrap();

        HttpTokenExchanger::new(reqwest::Client::new(), Arc::new(config))
    }

    fn shop() -> ShopDomain {
        ShopDomain::new("test-shop").unwrap()
    }

    #[tokio::test]
    async fn test_exchange_posts_credentials_and_returns_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/oauth/access_token"))
            .and(body_json(serde_json::json!({
                "client_id": "test-api-key",
                "client_secret": "test-secret",
                "code": "auth-code-123"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "shpat_new",
                "scope": "read_content,write_script_tags"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = exchanger_for(&server, 2)
            .exchange(&shop(), "auth-code-123")
            .await
            .unwrap();

        assert_eq!(token.access_token, "shpat_new");
        let granted = token.granted_scopes().unwrap();
        assert!(granted.iter().any(|s| s == "read_script_tags"));
    }

    #[tokio::test]
    async fn test_exchange_does_not_retry_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/oauth/access_token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid code"))
            .expect(1)
            .mount(&server)
            .await;

        let result = exchanger_for(&server, 2).exchange(&shop(), "bad").await;

        assert_eq!(
            result,
            Err(OAuthError::TokenExchangeFailed {
                status: Some(400),
                message: "invalid code".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_exchange_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/oauth/access_token"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/admin/oauth/access_token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "shpat_retry" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let token = exchanger_for(&server, 2)
            .exchange(&shop(), "code")
            .await
            .unwrap();
        assert_eq!(token.access_token, "shpat_retry");
        assert!(token.granted_scopes().is_none());
    }

    #[tokio::test]
    async fn test_exchange_gives_up_after_bounded_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/oauth/access_token"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let result = exchanger_for(&server, 1).exchange(&shop(), "code").await;
        assert!(matches!(
            result,
            Err(OAuthError::TokenExchangeFailed { status: Some(500), .. })
        ));
    }

    #[tokio::test]
    async fn test_exchange_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/oauth/access_token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "late" }))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let result = exchanger_for(&server, 0).exchange(&shop(), "code").await;
        assert!(matches!(
            result,
            Err(OAuthError::TokenExchangeFailed { status: None, message }) if message.contains("timed out")
        ));
    }

    #[tokio::test]
    async fn test_exchange_rejects_unparsable_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let result = exchanger_for(&server, 2).exchange(&shop(), "code").await;
        assert!(matches!(
            result,
            Err(OAuthError::TokenExchangeFailed { status: Some(200), .. })
        ));
    }

    #[test]
    fn test_access_token_response_masks_debug() {
        let token = AccessTokenResponse {
            access_token: "shpat_secret".to_string(),
            scope: None,
        };
        assert!(!format!("{token:?}").contains("shpat_secret"));
    }
}
