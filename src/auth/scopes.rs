//! OAuth scope handling.
//!
//! The TOC app needs to read blog content and, for the storefront script,
//! manage script tags. Scopes are configured as a comma-separated string.

use crate::error::ConfigError;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A set of OAuth scopes requested during installation.
///
/// Parsing deduplicates, trims and expands implied scopes: `write_foo`
/// implies `read_foo`. `Display` renders the sorted, comma-separated form
/// that goes into the authorize URL.
///
/// ```rust
/// use shopify_toc::AuthScopes;
///
/// let scopes: AuthScopes = "write_content, read_themes".parse().unwrap();
/// assert_eq!(scopes.to_string(), "read_content,read_themes,write_content");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct AuthScopes {
    scopes: BTreeSet<String>,
}

impl AuthScopes {
    /// Creates an empty scope set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the scope set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Returns `true` if every scope in `other` is present here.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        other.scopes.is_subset(&self.scopes)
    }

    /// Returns an iterator over the scopes in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.scopes.iter().map(String::as_str)
    }

    fn add_implied_scopes(&mut self) {
        let implied: Vec<String> = self
            .scopes
            .iter()
            .filter_map(|scope| Self::implied_scope(scope))
            .collect();

        self.scopes.extend(implied);
    }

    fn implied_scope(scope: &str) -> Option<String> {
        scope
            .strip_prefix("unauthenticated_write_")
            .map(|rest| format!("unauthenticated_read_{rest}"))
            .or_else(|| {
                scope
                    .strip_prefix("write_")
                    .map(|rest| format!("read_{rest}"))
            })
    }
}

impl FromStr for AuthScopes {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut scopes = BTreeSet::new();

        for scope in s.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if !scope.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(ConfigError::InvalidScopes {
                    reason: format!("Invalid characters in scope: '{scope}'"),
                });
            }
            scopes.insert(scope.to_string());
        }

        let mut auth_scopes = Self { scopes };
        auth_scopes.add_implied_scopes();
        Ok(auth_scopes)
    }
}

impl fmt::Display for AuthScopes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.iter().collect::<Vec<_>>().join(",");
        f.write_str(&joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_scopes_parses_and_sorts() {
        let scopes: AuthScopes = "read_themes, read_content".parse().unwrap();
        assert_eq!(scopes.to_string(), "read_content,read_themes");
    }

    #[test]
    fn test_auth_scopes_handles_implied_scopes() {
        let scopes: AuthScopes = "write_script_tags".parse().unwrap();
        assert!(scopes.iter().any(|s| s == "read_script_tags"));

        let scopes: AuthScopes = "unauthenticated_write_checkouts".parse().unwrap();
        assert!(scopes.iter().any(|s| s == "unauthenticated_read_checkouts"));
    }

    #[test]
    fn test_auth_scopes_skips_empty_segments() {
        let scopes: AuthScopes = ",read_content,,".parse().unwrap();
        assert_eq!(scopes.to_string(), "read_content");
        assert!("".parse::<AuthScopes>().unwrap().is_empty());
    }

    #[test]
    fn test_auth_scopes_rejects_invalid_characters() {
        let result = "read_content,write-products".parse::<AuthScopes>();
        assert!(matches!(result, Err(ConfigError::InvalidScopes { .. })));
    }

    #[test]
    fn test_auth_scopes_covers() {
        let granted: AuthScopes = "write_content".parse().unwrap();
        let required: AuthScopes = "read_content".parse().unwrap();
        assert!(granted.covers(&required));
        assert!(!required.covers(&granted));
    }
}
