use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use tracing::debug;

use super::{
    AccessToken, CredentialRecord, CredentialStore, Installation, StoreError, TocSettings,
    SINGLETON_ID,
};
use crate::config::ShopDomain;

pub type SqlitePool = Pool<Sqlite>;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS settings (
    id INTEGER PRIMARY KEY,
    shop TEXT,
    access_token TEXT,
    toc_enabled INTEGER NOT NULL DEFAULT 0,
    blacklist TEXT NOT NULL DEFAULT '[]',
    toc_title TEXT NOT NULL DEFAULT 'Table of Contents',
    toggle_show TEXT NOT NULL DEFAULT '[show]',
    toggle_hide TEXT NOT NULL DEFAULT '[hide]',
    updated_at TEXT NOT NULL
);
";

const SELECT_RECORD: &str = r"
SELECT shop, access_token, toc_enabled, blacklist, toc_title, toggle_show, toggle_hide, updated_at
FROM settings WHERE id = ?
";

/// [`CredentialStore`] on a SQLite database.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `url` and applies the schema.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the URL is invalid or the database
    /// cannot be opened.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the `settings` table if it does not exist.
    ///
    /// A table left by an older deployment lacks `updated_at`; the column is
    /// added in place so the existing row survives.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the DDL fails.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        for stmt in SCHEMA.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }

        let (has_updated_at,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM pragma_table_info('settings') WHERE name = 'updated_at'",
        )
        .fetch_one(&self.pool)
        .await?;
        if has_updated_at == 0 {
            sqlx::query("ALTER TABLE settings ADD COLUMN updated_at TEXT")
                .execute(&self.pool)
                .await?;
            debug!("added updated_at column to settings");
        }
        Ok(())
    }
}

fn decode_record(row: &SqliteRow) -> Result<CredentialRecord, StoreError> {
    let shop: Option<String> = row.try_get("shop")?;
    let access_token: Option<String> = row.try_get("access_token")?;

    let installation = match (shop, access_token) {
        (Some(shop), Some(token)) => Some(Installation {
            shop: ShopDomain::new(&shop).map_err(|_| StoreError::Corrupt {
                reason: format!("stored shop '{shop}' is not a shop domain"),
            })?,
            access_token: AccessToken::new(token),
        }),
        _ => None,
    };

    // Rows written by older deployments may hold NULL in any settings column.
    let defaults = TocSettings::default();
    let blacklist: Option<String> = row.try_get("blacklist")?;
    let updated_at: Option<String> = row.try_get("updated_at")?;

    let updated_at = match updated_at {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map_err(|e| StoreError::Corrupt {
                reason: format!("invalid updated_at '{raw}': {e}"),
            })?
            .with_timezone(&Utc),
        None => DateTime::<Utc>::UNIX_EPOCH,
    };

    Ok(CredentialRecord {
        installation,
        settings: TocSettings {
            toc_enabled: row
                .try_get::<Option<bool>, _>("toc_enabled")?
                .unwrap_or(defaults.toc_enabled),
            blacklist: match blacklist {
                Some(json) => serde_json::from_str(&json)?,
                None => defaults.blacklist,
            },
            toc_title: row
                .try_get::<Option<String>, _>("toc_title")?
                .unwrap_or(defaults.toc_title),
            toggle_show_label: row
                .try_get::<Option<String>, _>("toggle_show")?
                .unwrap_or(defaults.toggle_show_label),
            toggle_hide_label: row
                .try_get::<Option<String>, _>("toggle_hide")?
                .unwrap_or(defaults.toggle_hide_label),
        },
        updated_at,
    })
}

fn missing_after_write() -> StoreError {
    StoreError::Corrupt {
        reason: "record missing after upsert".to_string(),
    }
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn load(&self) -> Result<Option<CredentialRecord>, StoreError> {
        let row = sqlx::query(SELECT_RECORD)
            .bind(SINGLETON_ID)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(decode_record).transpose()
    }

    async fn save_installation(
        &self,
        installation: &Installation,
    ) -> Result<CredentialRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO settings (id, shop, access_token, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                shop=excluded.shop,
                access_token=excluded.access_token,
                updated_at=excluded.updated_at
            ",
        )
        .bind(SINGLETON_ID)
        .bind(installation.shop.as_ref())
        .bind(installation.access_token.as_ref())
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(SELECT_RECORD)
            .bind(SINGLETON_ID)
            .fetch_optional(&mut *tx)
            .await?;
        let record = row
            .as_ref()
            .map(decode_record)
            .transpose()?
            .ok_or_else(missing_after_write)?;

        tx.commit().await?;
        debug!(shop = %installation.shop, "stored installation");
        Ok(record)
    }

    async fn save_settings(&self, settings: &TocSettings) -> Result<CredentialRecord, StoreError> {
        let blacklist = serde_json::to_string(&settings.blacklist)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO settings (
                id, toc_enabled, blacklist, toc_title, toggle_show, toggle_hide, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                toc_enabled=excluded.toc_enabled,
                blacklist=excluded.blacklist,
                toc_title=excluded.toc_title,
                toggle_show=excluded.toggle_show,
                toggle_hide=excluded.toggle_hide,
                updated_at=excluded.updated_at
            ",
        )
        .bind(SINGLETON_ID)
        .bind(settings.toc_enabled)
        .bind(blacklist)
        .bind(&settings.toc_title)
        .bind(&settings.toggle_show_label)
        .bind(&settings.toggle_hide_label)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(SELECT_RECORD)
            .bind(SINGLETON_ID)
            .fetch_optional(&mut *tx)
            .await?;
        let record = row
            .as_ref()
            .map(decode_record)
            .transpose()?
            .ok_or_else(missing_after_write)?;

        tx.commit().await?;
        debug!("stored settings");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteStore {
        // One connection: every `:memory:` connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteStore::new(pool);
        store.init_schema().await.unwrap();
        store
    }

    fn installation(token: &str) -> Installation {
        Installation {
            shop: ShopDomain::new("test-shop").unwrap(),
            access_token: AccessToken::new(token),
        }
    }

    #[tokio::test]
    async fn test_load_empty_database() {
        let store = memory_store().await;
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let store = memory_store().await;
        store.init_schema().await.unwrap();
    }

    #[tokio::test]
    async fn test_installation_defaults_settings() {
        let store = memory_store().await;
        let record = store.save_installation(&installation("shpat_1")).await.unwrap();

        assert_eq!(record.installation, Some(installation("shpat_1")));
        assert_eq!(record.settings, TocSettings::default());
    }

    #[tokio::test]
    async fn test_settings_and_installation_do_not_clobber() {
        let store = memory_store().await;
        let settings = TocSettings {
            toc_enabled: true,
            blacklist: vec!["about-us".to_string(), "12345".to_string()],
            toc_title: "Inhalt".to_string(),
            toggle_show_label: "[zeigen]".to_string(),
            toggle_hide_label: "[verbergen]".to_string(),
        };

        store.save_installation(&installation("shpat_1")).await.unwrap();
        store.save_settings(&settings).await.unwrap();
        store.save_installation(&installation("shpat_2")).await.unwrap();

        let record = store.load().await.unwrap().unwrap();
        assert_eq!(record.settings, settings);
        assert_eq!(record.installation, Some(installation("shpat_2")));
    }

    #[tokio::test]
    async fn test_settings_before_install_leave_credential_empty() {
        let store = memory_store().await;
        store.save_settings(&TocSettings::default()).await.unwrap();

        let record = store.load().await.unwrap().unwrap();
        assert!(record.installation.is_none());
    }

    #[tokio::test]
    async fn test_single_row_after_repeated_writes() {
        let store = memory_store().await;
        store.save_installation(&installation("a")).await.unwrap();
        store.save_installation(&installation("b")).await.unwrap();
        store.save_settings(&TocSettings::default()).await.unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM settings")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn test_corrupt_shop_is_reported() {
        let store = memory_store().await;
        sqlx::query(
            "INSERT INTO settings (id, shop, access_token, updated_at) VALUES (1, 'evil.example.com', 't', ?)",
        )
        .bind(Utc::now().to_rfc3339())
        .execute(store.pool())
        .await
        .unwrap();

        assert!(matches!(store.load().await, Err(StoreError::Corrupt { .. })));
    }

    async fn legacy_store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query(
            r"
            CREATE TABLE settings (
                id INTEGER PRIMARY KEY,
                shop TEXT,
                access_token TEXT,
                toc_enabled INTEGER DEFAULT 0,
                blacklist TEXT DEFAULT '[]',
                toc_title TEXT DEFAULT 'Inhaltsverzeichnis',
                toggle_show TEXT DEFAULT '[anzeigen]',
                toggle_hide TEXT DEFAULT '[verbergen]'
            )
            ",
        )
        .execute(&pool)
        .await
        .unwrap();
        SqliteStore::new(pool)
    }

    #[tokio::test]
    async fn test_legacy_table_is_migrated() {
        let store = legacy_store().await;
        sqlx::query(
            "INSERT OR REPLACE INTO settings (id, shop, access_token) VALUES (1, 'test-shop.myshopify.com', 'shpat_old')",
        )
        .execute(store.pool())
        .await
        .unwrap();

        store.init_schema().await.unwrap();
        store.init_schema().await.unwrap();

        let record = store.load().await.unwrap().unwrap();
        assert_eq!(record.installation, Some(installation("shpat_old")));
        assert_eq!(record.settings.toc_title, "Inhaltsverzeichnis");
        assert_eq!(record.updated_at, DateTime::<Utc>::UNIX_EPOCH);

        let settings = TocSettings {
            toc_enabled: true,
            ..TocSettings::default()
        };
        let record = store.save_settings(&settings).await.unwrap();
        assert_eq!(record.settings, settings);
        assert_eq!(record.installation, Some(installation("shpat_old")));
        assert!(record.updated_at > DateTime::<Utc>::UNIX_EPOCH);

        let record = store.save_installation(&installation("shpat_new")).await.unwrap();
        assert_eq!(record.installation, Some(installation("shpat_new")));
        assert_eq!(record.settings, settings);
    }

    #[tokio::test]
    async fn test_null_settings_columns_fall_back_to_defaults() {
        let store = legacy_store().await;
        store.init_schema().await.unwrap();
        sqlx::query(
            r"
            INSERT INTO settings (
                id, shop, access_token, toc_enabled, blacklist, toc_title, toggle_show, toggle_hide
            ) VALUES (1, NULL, NULL, NULL, NULL, NULL, NULL, NULL)
            ",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let record = store.load().await.unwrap().unwrap();
        assert!(record.installation.is_none());
        assert_eq!(record.settings, TocSettings::default());
    }
}
