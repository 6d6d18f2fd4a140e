//! Application configuration.
//!
//! # Overview
//!
//! - [`AppConfig`]: everything the server needs, validated at construction
//! - [`AppConfigBuilder`]: fluent builder used by tests and embedders
//! - [`AppConfig::from_env`]: loads the same fields from process environment
//! - [`ApiKey`], [`ApiSecretKey`], [`ShopDomain`], [`HostUrl`]: validated newtypes
//! - [`ApiVersion`]: the Admin API version used for blog listing
//!
//! # Example
//!
//! ```rust
//! use shopify_toc::{ApiKey, ApiSecretKey, AppConfig, HostUrl};
//!
//! let config = AppConfig::builder()
//!     .api_key(ApiKey::new("my-api-key").unwrap())
//!     .api_secret_key(ApiSecretKey::new("my-secret").unwrap())
//!     .app_url(HostUrl::new("https://toc.example.com").unwrap())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.redirect_uri(), "https://toc.example.com/install/callback");
//! ```

mod newtypes;
mod version;

pub use newtypes::{ApiKey, ApiSecretKey, HostUrl, ShopDomain};
pub use version::ApiVersion;

use crate::auth::AuthScopes;
use crate::error::ConfigError;
use figment::providers::Env;
use figment::Figment;
use serde::Deserialize;
use std::time::Duration;

/// Path the platform redirects back to after authorization.
pub const CALLBACK_PATH: &str = "/install/callback";

const DEFAULT_SCOPES: &str = "read_content,write_script_tags";
const DEFAULT_HOME_PATH: &str = "/app";
const DEFAULT_DATABASE_URL: &str = "sqlite:database.sqlite?mode=rwc";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_STATE_TTL: Duration = Duration::from_secs(600);
const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_TOKEN_EXCHANGE_RETRIES: usize = 2;

/// Configuration for the app server.
///
/// `AppConfig` is `Clone + Send + Sync` and is shared behind an `Arc` in the
/// router state.
#[derive(Clone, Debug)]
pub struct AppConfig {
    api_key: ApiKey,
    api_secret_key: ApiSecretKey,
    scopes: AuthScopes,
    app_url: HostUrl,
    app_home_path: String,
    api_version: ApiVersion,
    state_ttl: Duration,
    upstream_timeout: Duration,
    token_exchange_retries: usize,
    admin_origin: Option<HostUrl>,
    cookie_secret: Option<String>,
    database_url: String,
    port: u16,
    log_level: String,
}

impl AppConfig {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::new()
    }

    /// Loads the configuration from the process environment.
    ///
    /// Call `dotenvy::dotenv()` first to pick up a local `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Environment`] when a variable is missing or has
    /// the wrong type, or the newtype error for a value that fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_figment(&Figment::from(Env::raw().only(EnvConfig::KEYS)))
    }

    /// Extracts the configuration from an arbitrary figment.
    ///
    /// Keys are the lowercase environment variable names.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_env`].
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let env: EnvConfig = figment
            .extract()
            .map_err(|e| ConfigError::Environment {
                reason: e.to_string(),
            })?;
        env.into_config()
    }

    /// Returns the API key (client id).
    #[must_use]
    pub const fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    /// Returns the API secret key.
    #[must_use]
    pub const fn api_secret_key(&self) -> &ApiSecretKey {
        &self.api_secret_key
    }

    /// Returns the scopes requested at install time.
    #[must_use]
    pub const fn scopes(&self) -> &AuthScopes {
        &self.scopes
    }

    /// Returns the app's public base URL.
    #[must_use]
    pub const fn app_url(&self) -> &HostUrl {
        &self.app_url
    }

    /// Returns the full OAuth `redirect_uri`.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        self.app_url.join(CALLBACK_PATH)
    }

    /// Returns the path the browser lands on after a successful install.
    #[must_use]
    pub fn app_home_path(&self) -> &str {
        &self.app_home_path
    }

    /// Returns the Admin API version.
    #[must_use]
    pub const fn api_version(&self) -> &ApiVersion {
        &self.api_version
    }

    /// Returns how long an issued state nonce stays valid.
    #[must_use]
    pub const fn state_ttl(&self) -> Duration {
        self.state_ttl
    }

    /// Returns the timeout applied to every outbound platform request.
    #[must_use]
    pub const fn upstream_timeout(&self) -> Duration {
        self.upstream_timeout
    }

    /// Returns how many extra token-exchange attempts are allowed.
    #[must_use]
    pub const fn token_exchange_retries(&self) -> usize {
        self.token_exchange_retries
    }

    /// Returns the admin origin override, if configured.
    #[must_use]
    pub const fn admin_origin(&self) -> Option<&HostUrl> {
        self.admin_origin.as_ref()
    }

    /// Returns the origin that serves `shop`'s admin endpoints.
    ///
    /// This is `https://{shop}` unless an override is configured for local
    /// development against a mock platform.
    #[must_use]
    pub fn shop_origin(&self, shop: &ShopDomain) -> String {
        self.admin_origin
            .as_ref()
            .map_or_else(|| shop.origin(), |origin| origin.as_ref().to_string())
    }

    /// Returns the key material for the encrypted state cookie.
    ///
    /// Falls back to the API secret key when no dedicated secret is set.
    #[must_use]
    pub fn cookie_secret(&self) -> &str {
        self.cookie_secret
            .as_deref()
            .unwrap_or_else(|| self.api_secret_key.as_ref())
    }

    /// Returns the database URL.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Returns the listen port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the default log filter.
    #[must_use]
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AppConfig>();
};

/// Builder for [`AppConfig`].
///
/// Required: `api_key`, `api_secret_key`, `app_url`. Everything else has a
/// default matching the environment loader.
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    api_key: Option<ApiKey>,
    api_secret_key: Option<ApiSecretKey>,
    scopes: Option<AuthScopes>,
    app_url: Option<HostUrl>,
    app_home_path: Option<String>,
    api_version: Option<ApiVersion>,
    state_ttl: Option<Duration>,
    upstream_timeout: Option<Duration>,
    token_exchange_retries: Option<usize>,
    admin_origin: Option<HostUrl>,
    cookie_secret: Option<String>,
    database_url: Option<String>,
    port: Option<u16>,
    log_level: Option<String>,
}

impl AppConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key (required).
    #[must_use]
    pub fn api_key(mut self, key: ApiKey) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Sets the API secret key (required).
    #[must_use]
    pub fn api_secret_key(mut self, key: ApiSecretKey) -> Self {
        self.api_secret_key = Some(key);
        self
    }

    /// Sets the requested scopes.
    #[must_use]
    pub fn scopes(mut self, scopes: AuthScopes) -> Self {
        self.scopes = Some(scopes);
        self
    }

    /// Sets the app's public base URL (required).
    #[must_use]
    pub fn app_url(mut self, url: HostUrl) -> Self {
        self.app_url = Some(url);
        self
    }

    /// Sets the post-install landing path.
    #[must_use]
    pub fn app_home_path(mut self, path: impl Into<String>) -> Self {
        self.app_home_path = Some(path.into());
        self
    }

    /// Sets the Admin API version.
    #[must_use]
    pub fn api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = Some(version);
        self
    }

    /// Sets the state nonce validity window.
    #[must_use]
    pub const fn state_ttl(mut self, ttl: Duration) -> Self {
        self.state_ttl = Some(ttl);
        self
    }

    /// Sets the outbound request timeout.
    #[must_use]
    pub const fn upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = Some(timeout);
        self
    }

    /// Sets the number of extra token-exchange attempts.
    #[must_use]
    pub const fn token_exchange_retries(mut self, retries: usize) -> Self {
        self.token_exchange_retries = Some(retries);
        self
    }

    /// Routes admin requests to `origin` instead of `https://{shop}`.
    #[must_use]
    pub fn admin_origin(mut self, origin: HostUrl) -> Self {
        self.admin_origin = Some(origin);
        self
    }

    /// Sets dedicated key material for the state cookie.
    #[must_use]
    pub fn cookie_secret(mut self, secret: impl Into<String>) -> Self {
        self.cookie_secret = Some(secret.into());
        self
    }

    /// Sets the database URL.
    #[must_use]
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Sets the listen port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the default log filter.
    #[must_use]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Builds the [`AppConfig`], validating that required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `api_key`,
    /// `api_secret_key` or `app_url` are not set.
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let api_key = self
            .api_key
            .ok_or(ConfigError::MissingRequiredField { field: "api_key" })?;
        let api_secret_key = self
            .api_secret_key
            .ok_or(ConfigError::MissingRequiredField {
                field: "api_secret_key",
            })?;
        let app_url = self
            .app_url
            .ok_or(ConfigError::MissingRequiredField { field: "app_url" })?;

        let scopes = match self.scopes {
            Some(scopes) => scopes,
            None => DEFAULT_SCOPES.parse()?,
        };

        Ok(AppConfig {
            api_key,
            api_secret_key,
            scopes,
            app_url,
            app_home_path: self
                .app_home_path
                .unwrap_or_else(|| DEFAULT_HOME_PATH.to_string()),
            api_version: self.api_version.unwrap_or_default(),
            state_ttl: self.state_ttl.unwrap_or(DEFAULT_STATE_TTL),
            upstream_timeout: self.upstream_timeout.unwrap_or(DEFAULT_UPSTREAM_TIMEOUT),
            token_exchange_retries: self
                .token_exchange_retries
                .unwrap_or(DEFAULT_TOKEN_EXCHANGE_RETRIES),
            admin_origin: self.admin_origin,
            cookie_secret: self.cookie_secret.filter(|s| !s.is_empty()),
            database_url: self
                .database_url
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            log_level: self.log_level.unwrap_or_else(|| "info".to_string()),
        })
    }
}

/// Raw environment shape; validated into [`AppConfig`].
#[derive(Debug, Deserialize)]
struct EnvConfig {
    shopify_api_key: String,
    shopify_api_secret: String,
    app_url: String,
    scopes: Option<String>,
    app_home_path: Option<String>,
    api_version: Option<ApiVersion>,
    database_url: Option<String>,
    port: Option<u16>,
    oauth_state_ttl_secs: Option<u64>,
    upstream_timeout_secs: Option<u64>,
    token_exchange_retries: Option<usize>,
    shopify_admin_origin: Option<String>,
    cookie_secret: Option<String>,
    log_level: Option<String>,
}

impl EnvConfig {
    const KEYS: &'static [&'static str] = &[
        "SHOPIFY_API_KEY",
        "SHOPIFY_API_SECRET",
        "APP_URL",
        "SCOPES",
        "APP_HOME_PATH",
        "API_VERSION",
        "DATABASE_URL",
        "PORT",
        "OAUTH_STATE_TTL_SECS",
        "UPSTREAM_TIMEOUT_SECS",
        "TOKEN_EXCHANGE_RETRIES",
        "SHOPIFY_ADMIN_ORIGIN",
        "COOKIE_SECRET",
        "LOG_LEVEL",
    ];

    fn into_config(self) -> Result<AppConfig, ConfigError> {
        let mut builder = AppConfig::builder()
            .api_key(ApiKey::new(self.shopify_api_key)?)
            .api_secret_key(ApiSecretKey::new(self.shopify_api_secret)?)
            .app_url(HostUrl::new(self.app_url)?);

        if let Some(scopes) = self.scopes {
            builder = builder.scopes(scopes.parse()?);
        }
        if let Some(path) = self.app_home_path {
            builder = builder.app_home_path(path);
        }
        if let Some(version) = self.api_version {
            builder = builder.api_version(version);
        }
        if let Some(url) = self.database_url {
            builder = builder.database_url(url);
        }
        if let Some(port) = self.port {
            builder = builder.port(port);
        }
        if let Some(secs) = self.oauth_state_ttl_secs {
            builder = builder.state_ttl(Duration::from_secs(secs));
        }
        if let Some(secs) = self.upstream_timeout_secs {
            builder = builder.upstream_timeout(Duration::from_secs(secs));
        }
        if let Some(retries) = self.token_exchange_retries {
            builder = builder.token_exchange_retries(retries);
        }
        if let Some(origin) = self.shopify_admin_origin {
            builder = builder.admin_origin(HostUrl::new(origin)?);
        }
        if let Some(secret) = self.cookie_secret {
            builder = builder.cookie_secret(secret);
        }
        if let Some(level) = self.log_level {
            builder = builder.log_level(level);
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::Serialized;

    fn minimal_builder() -> AppConfigBuilder {
        AppConfig::builder()
            .api_key(ApiKey::new("key").unwrap())
            .api_secret_key(ApiSecretKey::new("secret").unwrap())
            .app_url(HostUrl::new("https://toc.example.com").unwrap())
    }

    #[test]
    fn test_builder_requires_api_key() {
        let result = AppConfigBuilder::new()
            .api_secret_key(ApiSecretKey::new("secret").unwrap())
            .app_url(HostUrl::new("https://toc.example.com").unwrap())
            .build();

        assert!(matches!(
            result,
            Err(ConfigError::MissingRequiredField { field: "api_key" })
        ));
    }

    #[test]
    fn test_builder_requires_app_url() {
        let result = AppConfigBuilder::new()
            .api_key(ApiKey::new("key").unwrap())
            .api_secret_key(ApiSecretKey::new("secret").unwrap())
            .build();

        assert!(matches!(
            result,
            Err(ConfigError::MissingRequiredField { field: "app_url" })
        ));
    }

    #[test]
    fn test_builder_provides_defaults() {
        let config = minimal_builder().build().unwrap();

        assert_eq!(config.app_home_path(), "/app");
        assert_eq!(config.api_version(), &ApiVersion::latest());
        assert_eq!(config.state_ttl(), Duration::from_secs(600));
        assert_eq!(config.upstream_timeout(), Duration::from_secs(10));
        assert_eq!(config.token_exchange_retries(), 2);
        assert_eq!(config.port(), 3000);
        assert_eq!(
            config.scopes().to_string(),
            "read_content,read_script_tags,write_script_tags"
        );
        assert!(config.admin_origin().is_none());
    }

    #[test]
    fn test_cookie_secret_falls_back_to_api_secret() {
        let config = minimal_builder().build().unwrap();
        assert_eq!(config.cookie_secret(), "secret");

        let config = minimal_builder().cookie_secret("cookie-key").build().unwrap();
        assert_eq!(config.cookie_secret(), "cookie-key");
    }

    #[test]
    fn test_shop_origin_honours_override() {
        let shop = ShopDomain::new("my-store").unwrap();

        let config = minimal_builder().build().unwrap();
        assert_eq!(config.shop_origin(&shop), "https://my-store.myshopify.com");

        let config = minimal_builder()
            .admin_origin(HostUrl::new("http://127.0.0.1:9999").unwrap())
            .build()
            .unwrap();
        assert_eq!(config.shop_origin(&shop), "http://127.0.0.1:9999");
    }

    #[test]
    fn test_from_figment_reads_env_shape() {
        let figment = Figment::from(Serialized::defaults(serde_json::json!({
            "shopify_api_key": "env-key",
            "shopify_api_secret": "env-secret",
            "app_url": "https://toc.example.com/",
            "scopes": "read_content",
            "port": 8080,
            "oauth_state_ttl_secs": 120,
            "api_version": "2025-07",
        })));

        let config = AppConfig::from_figment(&figment).unwrap();

        assert_eq!(config.api_key().as_ref(), "env-key");
        assert_eq!(config.redirect_uri(), "https://toc.example.com/install/callback");
        assert_eq!(config.scopes().to_string(), "read_content");
        assert_eq!(config.port(), 8080);
        assert_eq!(config.state_ttl(), Duration::from_secs(120));
        assert_eq!(config.api_version(), &ApiVersion::V2025_07);
    }

    #[test]
    fn test_from_figment_reports_missing_secret() {
        let figment = Figment::from(Serialized::defaults(serde_json::json!({
            "shopify_api_key": "env-key",
            "app_url": "https://toc.example.com",
        })));

        let result = AppConfig::from_figment(&figment);
        assert!(matches!(result, Err(ConfigError::Environment { .. })));
    }

    #[test]
    fn test_from_figment_validates_newtypes() {
        let figment = Figment::from(Serialized::defaults(serde_json::json!({
            "shopify_api_key": "",
            "shopify_api_secret": "secret",
            "app_url": "https://toc.example.com",
        })));

        assert!(matches!(
            AppConfig::from_figment(&figment),
            Err(ConfigError::EmptyApiKey)
        ));
    }
}
