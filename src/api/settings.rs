//! `/api/settings` — operator configuration, admin-only on both GET and PUT per the
//! role-gating decision in the design document (read access is not gated to viewers
//! here because settings values are secrets, not campaign data).

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{Map, Value};

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::services::Services;

pub async fn get_settings(State(services): State<Arc<Services>>, user: AuthUser) -> AppResult<Json<Map<String, Value>>> {
    user.require_admin()?;
    Ok(Json(services.settings.snapshot(true)))
}

pub async fn put_settings(
    State(services): State<Arc<Services>>,
    user: AuthUser,
    Json(updates): Json<Map<String, Value>>,
) -> AppResult<Json<Map<String, Value>>> {
    user.require_admin()?;
    services.settings.save(updates).await.map_err(|e| crate::error::AppError::Internal(e.to_string()))?;
    Ok(Json(services.settings.snapshot(true)))
}
