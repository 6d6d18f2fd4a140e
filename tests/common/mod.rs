//! Shared helpers for router-level tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::header::SET_COOKIE;
use axum::http::Response;
use axum::Router;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use shopify_toc::auth::oauth::{compute_signature, AuthQuery};
use shopify_toc::server::{router, AppState};
use shopify_toc::store::MemoryStore;
use shopify_toc::{ApiKey, ApiSecretKey, AppConfig, AppConfigBuilder, HostUrl};

pub const API_KEY: &str = "test-api-key";
pub const API_SECRET: &str = "test-secret";
pub const SHOP: &str = "test-shop.myshopify.com";
pub const STATE_COOKIE: &str = "shopify_oauth_state";

pub fn config_builder(admin_origin: &str) -> AppConfigBuilder {
    AppConfig::builder()
        .api_key(ApiKey::new(API_KEY).unwrap())
        .api_secret_key(ApiSecretKey::new(API_SECRET).unwrap())
        .app_url(HostUrl::new("https://toc.example.com").unwrap())
        .scopes("read_content,write_script_tags".parse().unwrap())
        .admin_origin(HostUrl::new(admin_origin).unwrap())
        .upstream_timeout(Duration::from_millis(500))
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

pub fn test_app(builder: AppConfigBuilder) -> TestApp {
    let config = Arc::new(builder.build().unwrap());
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(config, store.clone()).unwrap();
    TestApp {
        router: router(state),
        store,
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Returns the `name=value` pair of the state cookie set on `response`.
pub fn state_cookie_pair(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{STATE_COOKIE}=")))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// Returns the full state cookie `Set-Cookie` header on `response`.
pub fn state_set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{STATE_COOKIE}=")))
        .map(str::to_string)
}

/// True when `response` tells the browser to drop the state cookie.
pub fn state_cookie_removed(response: &Response<Body>) -> bool {
    state_set_cookie(response).is_some_and(|header| {
        header.starts_with(&format!("{STATE_COOKIE}=;")) && header.contains("Max-Age=0")
    })
}

/// Appends a valid `hmac` to `unsigned` (a raw query without `hmac`).
pub fn sign_query(unsigned: &str, secret: &str) -> String {
    let signable = AuthQuery::parse(unsigned).to_signable_string();
    format!("{unsigned}&hmac={}", compute_signature(&signable, secret))
}

#[derive(Serialize)]
struct Claims {
    iss: String,
    dest: String,
    aud: String,
    sub: Option<String>,
    exp: i64,
    nbf: i64,
    iat: i64,
    jti: String,
    sid: Option<String>,
}

/// Signs an App Bridge session token for `shop`.
pub fn session_token(shop: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        iss: format!("https://{shop}/admin"),
        dest: format!("https://{shop}"),
        aud: API_KEY.to_string(),
        sub: Some("42".to_string()),
        exp: now + 60,
        nbf: now - 10,
        iat: now - 10,
        jti: format!("jti-{now}"),
        sid: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(API_SECRET.as_bytes()),
    )
    .unwrap()
}
