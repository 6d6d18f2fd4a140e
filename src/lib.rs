//! # Shopify table-of-contents app
//!
//! Backend of a storefront add-on that injects a table of contents into blog
//! articles. It installs itself on one shop through Shopify's OAuth flow,
//! stores the resulting offline token, and serves the display settings the
//! storefront script and the embedded admin page consume.
//!
//! ## Overview
//!
//! - [`config`]: validated configuration via [`AppConfig`] and
//!   [`AppConfigBuilder`], loaded from the environment with `figment`
//! - [`auth::oauth`]: install handshake (state nonce, HMAC verification,
//!   code exchange)
//! - [`auth::SessionToken`]: App Bridge session tokens guarding admin routes
//! - [`store`]: the singleton credential-and-settings record
//! - [`settings`]: public/full reads and validated writes of the settings
//! - [`blogs`]: blog listing passthrough for the admin page
//! - [`install`]: orchestration of an install attempt
//! - [`server`]: the axum router and JSON error mapping
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use shopify_toc::server::{router, AppState};
//! use shopify_toc::store::SqliteStore;
//! use shopify_toc::AppConfig;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(AppConfig::from_env()?);
//! let store = Arc::new(SqliteStore::connect(config.database_url()).await?);
//! let app = router(AppState::new(config, store)?);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: configuration and storage are passed explicitly
//! - **Fail-fast validation**: newtypes validate on construction
//! - **Thread-safe**: shared types are `Send + Sync`
//! - **Secrets stay masked**: API secrets and access tokens never appear in
//!   `Debug` output or logs

pub mod auth;
pub mod blogs;
pub mod config;
pub mod error;
pub mod install;
pub mod server;
pub mod settings;
pub mod store;

pub use auth::AuthScopes;
pub use config::{
    ApiKey, ApiSecretKey, ApiVersion, AppConfig, AppConfigBuilder, HostUrl, ShopDomain,
};
pub use error::ConfigError;
