//! API route registration — one `axum::Router` shared by every HTTP surface this
//! crate exposes, with the auth/settings/webhook/job/rule endpoints each in their own
//! module.

pub mod alert_rules;
pub mod automation_rules;
pub mod health;
pub mod jobs;
pub mod scheduled_reports;
pub mod settings;
pub mod webhooks;

use std::sync::Arc;

use axum::Router;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::GovernorLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::Services;

/// Rate limiting: 20 req/s sustained, burst up to 50 per IP. Public webhook and health
/// routes are not exempted from it — the verification handshake is low-volume and the
/// callback endpoint already authenticates via HMAC signature.
pub fn build_router(services: Arc<Services>) -> Router {
    let api_routes = Router::new()
        .route("/health", axum::routing::get(health::get_health))
        .route("/settings", axum::routing::get(settings::get_settings).put(settings::put_settings))
        .route("/webhooks/meta", axum::routing::get(webhooks::verify).post(webhooks::callback))
        .route("/jobs/export-report/{recipe_id}", axum::routing::post(jobs::enqueue_export))
        .route("/jobs/analyze-report/{recipe_id}", axum::routing::post(jobs::enqueue_analyze))
        .route("/jobs/{job_id}", axum::routing::get(jobs::get_job).delete(jobs::delete_job))
        .route("/jobs/{job_id}/download", axum::routing::get(jobs::download_job))
        .route("/jobs/{job_id}/pdf", axum::routing::get(jobs::job_pdf))
        .route("/alerts/rules", axum::routing::get(alert_rules::list_rules).post(alert_rules::create_rule))
        .route(
            "/alerts/rules/{id}",
            axum::routing::put(alert_rules::update_rule).delete(alert_rules::delete_rule),
        )
        .route("/alerts/rules/{id}/toggle", axum::routing::post(alert_rules::toggle_rule))
        .route("/alerts/test/{id}", axum::routing::post(alert_rules::test_rule))
        .route("/alerts/check-all", axum::routing::post(alert_rules::check_all))
        .route(
            "/automation/rules",
            axum::routing::get(automation_rules::list_rules).post(automation_rules::create_rule),
        )
        .route(
            "/automation/rules/{id}",
            axum::routing::put(automation_rules::update_rule).delete(automation_rules::delete_rule),
        )
        .route("/automation/rules/{id}/toggle", axum::routing::post(automation_rules::toggle_rule))
        .route("/automation/rules/{id}/run", axum::routing::post(automation_rules::run_rule))
        .route(
            "/scheduled-reports",
            axum::routing::get(scheduled_reports::list_reports).post(scheduled_reports::create_report),
        )
        .route(
            "/scheduled-reports/{id}",
            axum::routing::put(scheduled_reports::update_report).delete(scheduled_reports::delete_report),
        )
        .route("/scheduled-reports/{id}/run-now", axum::routing::post(scheduled_reports::run_now));

    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(20)
            .burst_size(50)
            .finish()
            .expect("valid governor config"),
    );

    Router::new()
        .nest("/api", api_routes)
        .layer(GovernorLayer { config: governor_config })
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(services)
}
