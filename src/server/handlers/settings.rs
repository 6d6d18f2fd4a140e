use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use tracing::debug;

use crate::server::extract::AdminSession;
use crate::server::{AppError, AppState};
use crate::settings::{FullSettings, SettingsUpdate};
use crate::store::TocSettings;

/// GET /settings/public
pub async fn read_public(State(state): State<AppState>) -> Result<Json<TocSettings>, AppError> {
    Ok(Json(state.settings.read_public().await?))
}

/// GET /settings/full (admin session required)
pub async fn read_full(
    State(state): State<AppState>,
    session: AdminSession,
) -> Result<Json<FullSettings>, AppError> {
    Ok(Json(state.settings.read_full(&session.shop).await?))
}

/// POST /settings (admin session required)
///
/// The body is parsed here rather than through `Json` so malformed input maps
/// to 400 `INVALID_SETTINGS` instead of axum's 415/422 rejections.
pub async fn write(
    State(state): State<AppState>,
    session: AdminSession,
    body: Bytes,
) -> Result<Json<TocSettings>, AppError> {
    let update = SettingsUpdate::from_json(&body)?;
    debug!(shop = %session.shop, "settings write");
    Ok(Json(state.settings.write(update).await?))
}
