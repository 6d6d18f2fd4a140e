use axum::extract::{RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use chrono::Utc;
use tracing::debug;

use crate::auth::oauth::{AuthQuery, StateNonce};
use crate::server::{AppError, AppState};

/// Name of the encrypted cookie carrying the pending install's nonce.
pub const STATE_COOKIE: &str = "shopify_oauth_state";

/// GET /install?shop= -> redirects to the shop's authorize page.
pub async fn start(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    RawQuery(raw): RawQuery,
) -> Result<Response, AppError> {
    let query = AuthQuery::parse(raw.as_deref().unwrap_or_default());
    let result = state.install.begin(query.get("shop"))?;

    let secure = state.config.app_url().scheme() == "https";
    let cookie = build_state_cookie(&result.state, state.config.state_ttl(), secure);

    Ok((jar.add(cookie), found(&result.auth_url)).into_response())
}

/// GET /install/callback -> verifies, exchanges the code, stores the token.
///
/// The state cookie is single-use and cleared on every outcome.
pub async fn callback(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    RawQuery(raw): RawQuery,
) -> Response {
    let query = AuthQuery::parse(raw.as_deref().unwrap_or_default());

    let cookie = jar
        .get(STATE_COOKIE)
        .and_then(|c| StateNonce::from_cookie_value(c.value()));
    if cookie.is_none() {
        debug!("callback arrived without a readable state cookie");
    }
    let jar = jar.remove(clear_state_cookie());

    match state.install.complete(&query, cookie.as_ref(), Utc::now()).await {
        Ok(_) => (jar, found(state.config.app_home_path())).into_response(),
        Err(err) => (jar, AppError::from(err)).into_response(),
    }
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

fn build_state_cookie(nonce: &StateNonce, ttl: std::time::Duration, secure: bool) -> Cookie<'static> {
    let max_age = time::Duration::try_from(ttl).unwrap_or(time::Duration::minutes(10));
    Cookie::build(Cookie::new(STATE_COOKIE, nonce.to_cookie_value()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

fn clear_state_cookie() -> Cookie<'static> {
    Cookie::build(Cookie::new(STATE_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}
