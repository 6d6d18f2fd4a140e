//! HTTP surface.
//!
//! | Route                   | Handler                         |
//! |-------------------------|---------------------------------|
//! | `GET /`                 | [`handlers::health`]            |
//! | `GET /install`          | [`handlers::install::start`]    |
//! | `GET /install/callback` | [`handlers::install::callback`] |
//! | `GET /settings/public`  | [`handlers::settings::read_public`] |
//! | `GET /settings/full`    | [`handlers::settings::read_full`]   |
//! | `POST /settings`        | [`handlers::settings::write`]   |
//! | `GET /api/blogs`        | [`handlers::blogs::list`]       |

mod error;
pub mod extract;
pub mod handlers;

pub use error::{ApiErrorBody, ApiErrorResponse, AppError};

use std::sync::Arc;

use axum::extract::FromRef;
use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::oauth::{HttpTokenExchanger, TokenExchanger};
use crate::blogs::BlogService;
use crate::config::{AppConfig, CALLBACK_PATH};
use crate::install::InstallService;
use crate::settings::SettingsService;
use crate::store::CredentialStore;

/// Shared router state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub install: InstallService,
    pub settings: SettingsService,
    pub blogs: BlogService,
    cookie_key: Key,
}

impl AppState {
    /// Wires the services with a real HTTP token exchanger.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error if the HTTP client cannot be built.
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn CredentialStore>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.upstream_timeout())
            .build()?;
        let exchanger = Arc::new(HttpTokenExchanger::new(client.clone(), config.clone()));
        Ok(Self::with_exchanger(config, store, exchanger, client))
    }

    /// Wires the services around an explicit exchanger and HTTP client.
    pub fn with_exchanger(
        config: Arc<AppConfig>,
        store: Arc<dyn CredentialStore>,
        exchanger: Arc<dyn TokenExchanger>,
        client: reqwest::Client,
    ) -> Self {
        // Key::from needs 64 bytes; SHA-512 stretches any secret to that.
        let digest = Sha512::digest(config.cookie_secret().as_bytes());
        let cookie_key = Key::from(digest.as_slice());

        Self {
            install: InstallService::new(config.clone(), exchanger, store.clone()),
            settings: SettingsService::new(store.clone()),
            blogs: BlogService::new(client, config.clone(), store),
            config,
            cookie_key,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route("/install", get(handlers::install::start))
        .route(CALLBACK_PATH, get(handlers::install::callback))
        .route("/settings/public", get(handlers::settings::read_public))
        .route("/settings/full", get(handlers::settings::read_full))
        .route("/settings", post(handlers::settings::write))
        .route("/api/blogs", get(handlers::blogs::list))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
