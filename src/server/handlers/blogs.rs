use axum::extract::State;
use axum::Json;
use serde_json::Value;

use crate::server::extract::AdminSession;
use crate::server::{AppError, AppState};

/// GET /api/blogs (admin session required)
pub async fn list(State(state): State<AppState>, session: AdminSession) -> Result<Json<Value>, AppError> {
    Ok(Json(state.blogs.list(&session.shop).await?))
}
