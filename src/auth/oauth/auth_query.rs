//! OAuth callback query parameters.
//!
//! The HMAC covers every parameter Shopify sent, in the order it sent them,
//! so the callback query is kept as an ordered list of decoded pairs rather
//! than deserialized into a struct.

use crate::auth::oauth::OAuthError;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Bytes left unescaped when re-encoding parameters for signing.
///
/// Matches the platform's query-string encoder: alphanumerics and
/// `- _ . ! ~ * ' ( )` pass through, everything else is `%XX` (space is `%20`).
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Query parameters received on the OAuth callback, in received order.
///
/// ```rust
/// use shopify_toc::auth::oauth::AuthQuery;
///
/// let query = AuthQuery::parse("shop=a.myshopify.com&code=x%20y&hmac=abc");
/// assert_eq!(query.get("code"), Some("x y"));
/// assert_eq!(query.to_signable_string(), "shop=a.myshopify.com&code=x%20y");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthQuery {
    params: Vec<(String, String)>,
}

/// The four parameters every callback must carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallbackParams<'a> {
    /// Shop domain as sent by the platform (not yet validated).
    pub shop: &'a str,
    /// Signature over the remaining parameters.
    pub hmac: &'a str,
    /// Authorization code to exchange.
    pub code: &'a str,
    /// State nonce echoed back from the authorize redirect.
    pub state: &'a str,
}

impl AuthQuery {
    /// Name of the signature parameter, excluded from the signed message.
    pub const HMAC_PARAM: &'static str = "hmac";

    /// Parses a raw (still percent-encoded) query string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let params = url::form_urlencoded::parse(raw.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { params }
    }

    /// Builds a query from already-decoded pairs.
    #[must_use]
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            params: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Appends a parameter.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.push((key.into(), value.into()));
    }

    /// Returns the first value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the decoded pairs in received order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the required callback parameters.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::MissingParameters`] naming every parameter that
    /// is absent or empty.
    pub fn callback_params(&self) -> Result<CallbackParams<'_>, OAuthError> {
        let present = |key: &str| self.get(key).filter(|v| !v.is_empty());

        match (present("shop"), present("hmac"), present("code"), present("state")) {
            (Some(shop), Some(hmac), Some(code), Some(state)) => Ok(CallbackParams {
                shop,
                hmac,
                code,
                state,
            }),
            _ => {
                let missing = ["shop", "hmac", "code", "state"]
                    .into_iter()
                    .filter(|key| present(*key).is_none())
                    .collect();
                Err(OAuthError::MissingParameters { missing })
            }
        }
    }

    /// Re-encodes every parameter except `hmac` into the signed message.
    ///
    /// Pairs keep their received order; keys and values are escaped with the
    /// platform's component encoding and joined with `&`.
    #[must_use]
    pub fn to_signable_string(&self) -> String {
        self.params
            .iter()
            .filter(|(k, _)| k != Self::HMAC_PARAM)
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(k, QUERY_COMPONENT),
                    utf8_percent_encode(v, QUERY_COMPONENT)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_received_order() {
        let query = AuthQuery::parse("state=s&shop=a.myshopify.com&code=c&hmac=h&timestamp=1");
        let keys: Vec<&str> = query.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["state", "shop", "code", "hmac", "timestamp"]);
        assert_eq!(
            query.to_signable_string(),
            "state=s&shop=a.myshopify.com&code=c&timestamp=1"
        );
    }

    #[test]
    fn test_signable_string_uses_platform_escaping() {
        let query = AuthQuery::from_pairs([
            ("host", "YWRtaW4uc2hvcGlmeS5jb20vc3RvcmUvdGVzdA=="),
            ("note", "a b+c/d!*'()~"),
            ("hmac", "ignored"),
        ]);

        assert_eq!(
            query.to_signable_string(),
            "host=YWRtaW4uc2hvcGlmeS5jb20vc3RvcmUvdGVzdA%3D%3D&note=a%20b%2Bc%2Fd!*'()~"
        );
    }

    #[test]
    fn test_parse_decodes_plus_as_space() {
        let query = AuthQuery::parse("note=a+b&other=%2B");
        assert_eq!(query.get("note"), Some("a b"));
        assert_eq!(query.get("other"), Some("+"));
        assert_eq!(query.to_signable_string(), "note=a%20b&other=%2B");
    }

    #[test]
    fn test_signable_string_escapes_unicode() {
        let query = AuthQuery::from_pairs([("title", "Inhaltsverzeichnis ü")]);
        assert_eq!(query.to_signable_string(), "title=Inhaltsverzeichnis%20%C3%BC");
    }

    #[test]
    fn test_callback_params_requires_all_four() {
        let query = AuthQuery::parse("shop=a.myshopify.com&code=c&state=");
        match query.callback_params() {
            Err(OAuthError::MissingParameters { missing }) => {
                assert_eq!(missing, vec!["hmac", "state"]);
            }
            other => panic!("expected MissingParameters, got {other:?}"),
        }
    }

    #[test]
    fn test_callback_params_returns_values() {
        let query = AuthQuery::parse("code=c&hmac=h&shop=a.myshopify.com&state=s&timestamp=1");
        let params = query.callback_params().unwrap();
        assert_eq!(params.shop, "a.myshopify.com");
        assert_eq!(params.hmac, "h");
        assert_eq!(params.code, "c");
        assert_eq!(params.state, "s");
    }
}
