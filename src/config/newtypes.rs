//! Validated newtype wrappers for configuration values.
//!
//! Anything that reaches an [`AppConfig`](super::AppConfig), a redirect
//! `Location` or an outbound request URL has gone through one of these.

use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use url::Url;

use crate::error::ConfigError;

fn non_blank(value: impl Into<String>, err: ConfigError) -> Result<String, ConfigError> {
    let value = value.into();
    if value.trim().is_empty() {
        Err(err)
    } else {
        Ok(value)
    }
}

/// The app's client id, as shown in the partner dashboard.
///
/// ```rust
/// use shopify_toc::ApiKey;
///
/// let key = ApiKey::new("0123abcd").unwrap();
/// assert_eq!(key.as_ref(), "0123abcd");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// # Errors
    ///
    /// [`ConfigError::EmptyApiKey`] for an empty or all-whitespace key.
    pub fn new(key: impl Into<String>) -> Result<Self, ConfigError> {
        non_blank(key, ConfigError::EmptyApiKey).map(Self)
    }
}

impl AsRef<str> for ApiKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The client secret shared with Shopify.
///
/// Keys callback HMACs, session-token signatures and the code exchange.
/// `Debug` never prints it.
///
/// ```rust
/// use shopify_toc::ApiSecretKey;
///
/// let secret = ApiSecretKey::new("shpss_123").unwrap();
/// assert_eq!(format!("{secret:?}"), "ApiSecretKey(*****)");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ApiSecretKey(String);

impl ApiSecretKey {
    /// # Errors
    ///
    /// [`ConfigError::EmptyApiSecretKey`] for an empty or all-whitespace secret.
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        non_blank(secret, ConfigError::EmptyApiSecretKey).map(Self)
    }
}

impl AsRef<str> for ApiSecretKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiSecretKey(*****)")
    }
}

/// A `*.myshopify.com` host.
///
/// The shop becomes the host of the authorize redirect and of every admin
/// request, so only a single DNS label under `myshopify.com` is accepted.
/// A bare label such as `My-Store` is lowercased and completed.
///
/// ```rust
/// use shopify_toc::ShopDomain;
///
/// let shop = ShopDomain::new("My-Store").unwrap();
/// assert_eq!(shop.as_ref(), "my-store.myshopify.com");
/// assert_eq!(shop.shop_name(), "my-store");
///
/// assert!(ShopDomain::new("evil.example.com").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShopDomain(String);

impl ShopDomain {
    const SUFFIX: &'static str = ".myshopify.com";

    /// # Errors
    ///
    /// [`ConfigError::InvalidShopDomain`] when the input is not a shop label
    /// or a `<label>.myshopify.com` host.
    pub fn new(domain: impl Into<String>) -> Result<Self, ConfigError> {
        let input = domain.into().trim().to_ascii_lowercase();
        let label = input.strip_suffix(Self::SUFFIX).unwrap_or(&input);

        if !is_dns_label(label) {
            return Err(ConfigError::InvalidShopDomain { domain: input });
        }
        Ok(Self(format!("{label}{}", Self::SUFFIX)))
    }

    /// The label before `.myshopify.com`.
    #[must_use]
    pub fn shop_name(&self) -> &str {
        self.0.strip_suffix(Self::SUFFIX).unwrap_or(&self.0)
    }

    /// `https://{shop}`
    #[must_use]
    pub fn origin(&self) -> String {
        format!("https://{}", self.0)
    }
}

fn is_dns_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= 63
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

impl AsRef<str> for ShopDomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ShopDomain {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ShopDomain {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(de::Error::custom)
    }
}

/// An absolute `http(s)` base URL, kept without a trailing slash.
///
/// ```rust
/// use shopify_toc::HostUrl;
///
/// let url = HostUrl::new("https://toc.example.com/").unwrap();
/// assert_eq!(url.as_ref(), "https://toc.example.com");
/// assert_eq!(url.join("/install"), "https://toc.example.com/install");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostUrl {
    base: String,
    parsed: Url,
}

impl HostUrl {
    /// # Errors
    ///
    /// [`ConfigError::InvalidHostUrl`] unless the input parses as an absolute
    /// `http` or `https` URL with a host.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let base = url.into().trim().trim_end_matches('/').to_string();
        let invalid = || ConfigError::InvalidHostUrl { url: base.clone() };

        let parsed = Url::parse(&base).map_err(|_| invalid())?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(invalid());
        }
        Ok(Self { base, parsed })
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        self.parsed.scheme()
    }

    /// `self` followed by `path`, with exactly one slash between them.
    #[must_use]
    pub fn join(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }
}

impl AsRef<str> for HostUrl {
    fn as_ref(&self) -> &str {
        &self.base
    }
}
