//! Persistence of the singleton installation record.
//!
//! The app serves exactly one shop, so all state lives in a single row
//! (`id = 1`) holding the shop's credential and its table-of-contents
//! settings. Both halves are written with upsert semantics and neither write
//! clobbers the other half.
//!
//! - [`CredentialStore`]: the storage seam
//! - [`SqliteStore`]: durable storage through `sqlx`
//! - [`MemoryStore`]: in-process storage for tests and ephemeral runs

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ShopDomain;

/// Primary key of the only row the store ever holds.
pub const SINGLETON_ID: i64 = 1;

/// Errors raised by a [`CredentialStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database rejected or failed a query.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored JSON column could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value is not valid for its column.
    #[error("Corrupt record: {reason}")]
    Corrupt {
        /// What was wrong with the stored value.
        reason: String,
    },

    /// The backend refused the write.
    #[error("Store unavailable: {reason}")]
    Unavailable {
        /// Why the write was refused.
        reason: String,
    },
}

/// An offline Admin API access token.
///
/// `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl AsRef<str> for AccessToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(*****)")
    }
}

/// Table-of-contents display configuration.
///
/// Serializes in camelCase; this is the JSON shape the storefront script and
/// the admin page consume.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TocSettings {
    /// Whether the table of contents is rendered at all.
    pub toc_enabled: bool,
    /// Article identifiers (handles or ids) that never get a table of contents.
    pub blacklist: Vec<String>,
    /// Heading shown above the table of contents.
    pub toc_title: String,
    /// Label of the expand toggle.
    pub toggle_show_label: String,
    /// Label of the collapse toggle.
    pub toggle_hide_label: String,
}

impl TocSettings {
    /// Default heading.
    pub const DEFAULT_TITLE: &'static str = "Table of Contents";
    /// Default expand label.
    pub const DEFAULT_SHOW_LABEL: &'static str = "[show]";
    /// Default collapse label.
    pub const DEFAULT_HIDE_LABEL: &'static str = "[hide]";
}

impl Default for TocSettings {
    fn default() -> Self {
        Self {
            toc_enabled: false,
            blacklist: Vec::new(),
            toc_title: Self::DEFAULT_TITLE.to_string(),
            toggle_show_label: Self::DEFAULT_SHOW_LABEL.to_string(),
            toggle_hide_label: Self::DEFAULT_HIDE_LABEL.to_string(),
        }
    }
}

/// The shop credential captured at install time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Installation {
    /// The installed shop.
    pub shop: ShopDomain,
    /// Its offline access token.
    pub access_token: AccessToken,
}

/// The singleton row.
///
/// `installation` is `None` when settings were saved before any install
/// completed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Shop credential, once installed.
    pub installation: Option<Installation>,
    /// Display settings.
    pub settings: TocSettings,
    /// Time of the last write to either half.
    pub updated_at: DateTime<Utc>,
}

/// Storage for the singleton [`CredentialRecord`].
///
/// Implementations must make each upsert atomic: a reader sees either the
/// previous or the new record, never a mix.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns the record, or `None` if nothing was ever written.
    async fn load(&self) -> Result<Option<CredentialRecord>, StoreError>;

    /// Stores the shop credential, keeping existing settings (or defaults).
    async fn save_installation(
        &self,
        installation: &Installation,
    ) -> Result<CredentialRecord, StoreError>;

    /// Stores display settings, keeping any existing credential.
    async fn save_settings(&self, settings: &TocSettings) -> Result<CredentialRecord, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_json_shape() {
        let json = serde_json::to_value(TocSettings::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "tocEnabled": false,
                "blacklist": [],
                "tocTitle": "Table of Contents",
                "toggleShowLabel": "[show]",
                "toggleHideLabel": "[hide]"
            })
        );
    }

    #[test]
    fn test_access_token_debug_is_masked() {
        let token = AccessToken::new("shpat_secret");
        assert_eq!(format!("{token:?}"), "AccessToken(*****)");
        assert_eq!(token.as_ref(), "shpat_secret");
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"shpat_secret\"");
    }
}
