//! Liveness probe — public, no auth.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::services::Services;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub db_connected: bool,
}

pub async fn get_health(State(services): State<Arc<Services>>) -> Json<HealthResponse> {
    let db_ok = sqlx::query("SELECT 1").fetch_one(&services.pool).await.is_ok();
    Json(HealthResponse {
        status: if db_ok { "healthy".to_string() } else { "degraded".to_string() },
        db_connected: db_ok,
    })
}
