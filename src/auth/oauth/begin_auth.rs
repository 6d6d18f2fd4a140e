//! OAuth authorization URL generation.
//!
//! [`begin_auth`] is the `Idle → AwaitingAuthorization` step: it validates the
//! shop, issues a [`StateNonce`] and builds the authorize URL. The caller
//! stores the nonce in the state cookie and redirects the browser.

use crate::auth::oauth::error::OAuthError;
use crate::auth::oauth::state::StateNonce;
use crate::config::{AppConfig, ShopDomain};

/// Result of starting an installation.
///
/// `state` **must** be delivered to the browser as the state cookie; the
/// callback is rejected without it.
#[derive(Clone, Debug)]
pub struct BeginAuthResult {
    /// The validated shop being installed.
    pub shop: ShopDomain,

    /// The full authorization URL to redirect the merchant to.
    pub auth_url: String,

    /// The nonce embedded as the `state` parameter of `auth_url`.
    pub state: StateNonce,
}

/// Starts the authorization code flow for `shop`.
///
/// # Errors
///
/// - [`OAuthError::MissingShop`] if `shop` is `None` or blank
/// - [`OAuthError::InvalidShop`] if it is not a `myshopify.com` domain
///
/// # Example
///
/// ```rust
/// use shopify_toc::{ApiKey, ApiSecretKey, AppConfig, HostUrl};
/// use shopify_toc::auth::oauth::begin_auth;
///
/// let config = AppConfig::builder()
///     .api_key(ApiKey::new("api-key").unwrap())
///     .api_secret_key(ApiSecretKey::new("secret").unwrap())
///     .app_url(HostUrl::new("https://toc.example.com").unwrap())
///     .scopes("read_content".parse().unwrap())
///     .build()
///     .unwrap();
///
/// let result = begin_auth(&config, Some("test-shop.myshopify.com")).unwrap();
/// assert!(result.auth_url.starts_with("https://test-shop.myshopify.com/admin/oauth/authorize?"));
/// assert!(result.auth_url.contains(&format!("state={}", result.state.value())));
/// ```
pub fn begin_auth(config: &AppConfig, shop: Option<&str>) -> Result<BeginAuthResult, OAuthError> {
    let shop = shop
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(OAuthError::MissingShop)?;

    let shop = ShopDomain::new(shop).map_err(|_| OAuthError::InvalidShop {
        shop: shop.to_string(),
    })?;

    let state = StateNonce::issue();
    let redirect_uri = config.redirect_uri();

    let params = [
        ("client_id", config.api_key().as_ref().to_string()),
        ("scope", config.scopes().to_string()),
        ("redirect_uri", redirect_uri),
        ("state", state.value().to_string()),
    ];

    let query_string = params
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let auth_url = format!(
        "{}/admin/oauth/authorize?{query_string}",
        config.shop_origin(&shop)
    );

    Ok(BeginAuthResult {
        shop,
        auth_url,
        state,
    })
}

const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<BeginAuthResult>();
};
