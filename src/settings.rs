//! Table-of-contents settings API.
//!
//! Three operations over the singleton record:
//!
//! - [`SettingsService::read_public`]: display settings only, defaults until
//!   something was saved; safe for the storefront
//! - [`SettingsService::read_full`]: settings plus shop and token, for the
//!   installed shop's admin only
//! - [`SettingsService::write`]: validate and store an update

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::ShopDomain;
use crate::store::{AccessToken, CredentialStore, StoreError, TocSettings};

const MAX_LABEL_CHARS: usize = 200;
const MAX_BLACKLIST_ENTRIES: usize = 1000;
const MAX_BLACKLIST_ENTRY_CHARS: usize = 255;

/// Errors from the settings operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The update was malformed or failed validation.
    #[error("Invalid settings: {reason}")]
    Invalid {
        /// What was wrong.
        reason: String,
    },

    /// No shop has completed installation.
    #[error("App is not installed")]
    NotInstalled,

    /// The caller's session belongs to a different shop.
    #[error("Session shop {requested} does not match the installed shop")]
    ShopMismatch {
        /// Shop named by the caller's session.
        requested: ShopDomain,
    },

    /// Storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Partial settings update as posted by the admin page.
///
/// Absent fields keep their stored value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    /// New enabled flag.
    pub toc_enabled: Option<bool>,
    /// Replacement exclusion list.
    pub blacklist: Option<Vec<String>>,
    /// New heading.
    pub toc_title: Option<String>,
    /// New expand label.
    pub toggle_show_label: Option<String>,
    /// New collapse label.
    pub toggle_hide_label: Option<String>,
}

impl SettingsUpdate {
    /// Parses a JSON request body.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] if the body is not a JSON object of
    /// the expected shape, e.g. when `blacklist` is not a list of strings.
    pub fn from_json(body: &[u8]) -> Result<Self, SettingsError> {
        serde_json::from_slice(body).map_err(|e| SettingsError::Invalid {
            reason: e.to_string(),
        })
    }

    /// Applies the update on top of `current`, validating the result.
    ///
    /// Labels are trimmed and must stay non-empty. Blacklist entries are
    /// trimmed, must be non-empty, and duplicates are dropped keeping the
    /// first occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] describing the first failing field.
    pub fn apply(self, current: &TocSettings) -> Result<TocSettings, SettingsError> {
        let blacklist = match self.blacklist {
            Some(entries) => normalize_blacklist(entries)?,
            None => current.blacklist.clone(),
        };

        Ok(TocSettings {
            toc_enabled: self.toc_enabled.unwrap_or(current.toc_enabled),
            blacklist,
            toc_title: label("tocTitle", self.toc_title, &current.toc_title)?,
            toggle_show_label: label(
                "toggleShowLabel",
                self.toggle_show_label,
                &current.toggle_show_label,
            )?,
            toggle_hide_label: label(
                "toggleHideLabel",
                self.toggle_hide_label,
                &current.toggle_hide_label,
            )?,
        })
    }
}

fn label(field: &str, value: Option<String>, current: &str) -> Result<String, SettingsError> {
    let Some(value) = value else {
        return Ok(current.to_string());
    };

    let value = value.trim();
    if value.is_empty() {
        return Err(SettingsError::Invalid {
            reason: format!("{field} must not be empty"),
        });
    }
    if value.chars().count() > MAX_LABEL_CHARS {
        return Err(SettingsError::Invalid {
            reason: format!("{field} must be at most {MAX_LABEL_CHARS} characters"),
        });
    }
    Ok(value.to_string())
}

fn normalize_blacklist(entries: Vec<String>) -> Result<Vec<String>, SettingsError> {
    if entries.len() > MAX_BLACKLIST_ENTRIES {
        return Err(SettingsError::Invalid {
            reason: format!("blacklist must have at most {MAX_BLACKLIST_ENTRIES} entries"),
        });
    }

    let mut normalized: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(SettingsError::Invalid {
                reason: "blacklist entries must not be empty".to_string(),
            });
        }
        if entry.chars().count() > MAX_BLACKLIST_ENTRY_CHARS {
            return Err(SettingsError::Invalid {
                reason: format!(
                    "blacklist entries must be at most {MAX_BLACKLIST_ENTRY_CHARS} characters"
                ),
            });
        }
        if !normalized.iter().any(|e| e == entry) {
            normalized.push(entry.to_string());
        }
    }
    Ok(normalized)
}

/// Everything stored for the installed shop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullSettings {
    /// The installed shop.
    pub shop: ShopDomain,
    /// Its offline access token.
    pub access_token: AccessToken,
    /// Display settings.
    #[serde(flatten)]
    pub settings: TocSettings,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}

/// Settings operations over a [`CredentialStore`].
#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn CredentialStore>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Returns the display settings, or the defaults if none were saved.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    pub async fn read_public(&self) -> Result<TocSettings, StoreError> {
        Ok(self
            .store
            .load()
            .await?
            .map(|record| record.settings)
            .unwrap_or_default())
    }

    /// Returns the full record for `requesting_shop`'s admin.
    ///
    /// # Errors
    ///
    /// - [`SettingsError::NotInstalled`] if no install has completed
    /// - [`SettingsError::ShopMismatch`] if `requesting_shop` is not the
    ///   installed shop
    pub async fn read_full(&self, requesting_shop: &ShopDomain) -> Result<FullSettings, SettingsError> {
        let record = self.store.load().await?.ok_or(SettingsError::NotInstalled)?;
        let installation = record.installation.ok_or(SettingsError::NotInstalled)?;

        if &installation.shop != requesting_shop {
            return Err(SettingsError::ShopMismatch {
                requested: requesting_shop.clone(),
            });
        }

        Ok(FullSettings {
            shop: installation.shop,
            access_token: installation.access_token,
            settings: record.settings,
            updated_at: record.updated_at,
        })
    }

    /// Validates `update` against the stored settings and saves the result.
    ///
    /// Re-sending the same update leaves the stored settings unchanged.
    ///
    /// # Errors
    ///
    /// - [`SettingsError::Invalid`] if validation fails; nothing is written
    /// - [`SettingsError::Store`] if the store fails
    pub async fn write(&self, update: SettingsUpdate) -> Result<TocSettings, SettingsError> {
        let current = self.read_public().await?;
        let settings = update.apply(&current)?;

        let record = self.store.save_settings(&settings).await?;
        info!(
            toc_enabled = record.settings.toc_enabled,
            blacklist_len = record.settings.blacklist.len(),
            "settings updated"
        );
        Ok(record.settings)
    }
}
