//! HMAC validation for OAuth callbacks.
//!
//! Shopify signs the callback query with the app's secret key. The signature
//! is HMAC-SHA256 over the re-encoded query (minus `hmac` itself), sent as
//! lowercase hex.
//!
//! # Security
//!
//! All comparisons are constant-time.
//!
//! ```rust
//! use shopify_toc::auth::oauth::hmac::compute_signature;
//!
//! let signature = compute_signature("code=abc123&shop=example.myshopify.com", "my-api-secret");
//! assert_eq!(signature.len(), 64);
//! assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
//! ```

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::auth::oauth::{AuthQuery, OAuthError};

type HmacSha256 = Hmac<Sha256>;

/// Computes a lowercase hex HMAC-SHA256 signature of `message`.
#[must_use]
#[allow(clippy::missing_panics_doc)] // HMAC accepts any key size, so this never panics
pub fn compute_signature(message: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Performs constant-time comparison of two strings.
///
/// Strings of different lengths compare unequal without early exit on content.
#[must_use]
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Verifies that the callback query was signed with `secret`.
///
/// The received `hmac` is compared case-insensitively, since hex digits may
/// arrive upper-cased from intermediaries.
///
/// # Errors
///
/// Returns [`OAuthError::SignatureMismatch`] when the query has no `hmac`
/// parameter or it does not match the recomputed signature.
pub fn verify_callback_hmac(query: &AuthQuery, secret: &str) -> Result<(), OAuthError> {
    let received = query
        .get(AuthQuery::HMAC_PARAM)
        .ok_or(OAuthError::SignatureMismatch)?
        .to_ascii_lowercase();

    let computed = compute_signature(&query.to_signable_string(), secret);

    if constant_time_compare(&computed, &received) {
        Ok(())
    } else {
        Err(OAuthError::SignatureMismatch)
    }
}

mod hex {
    const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        let bytes = bytes.as_ref();
        let mut result = String::with_capacity(bytes.len() * 2);
        for &byte in bytes {
            result.push(HEX_CHARS[(byte >> 4) as usize] as char);
            result.push(HEX_CHARS[(byte & 0x0f) as usize] as char);
        }
        result
    }
}
