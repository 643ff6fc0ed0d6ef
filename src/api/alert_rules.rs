//! `/api/alerts/*` — CRUD for alert rules, toggling, and ad-hoc evaluation endpoints.
//! Toggling stays at Manager level per the design document: alert rules only read
//! campaign metrics, they never write back to the ad account.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::domain::{validate_cooldown_minutes, AlertRule};
use crate::error::{AppError, AppResult};
use crate::rules::{alert_rule_eligible, find_first_match};
use crate::scheduler::fire_alert;
use crate::services::Services;

#[derive(Deserialize)]
pub struct AlertRuleInput {
    pub name: String,
    pub metric: String,
    pub condition: String,
    pub threshold: f64,
    pub ad_account_id: Option<String>,
    pub channels: serde_json::Value,
    pub email_to: Option<String>,
    pub im_to: Option<String>,
    pub cooldown_minutes: i32,
    pub is_active: bool,
}

pub async fn list_rules(State(services): State<Arc<Services>>, _user: AuthUser) -> AppResult<Json<Vec<AlertRule>>> {
    let rules: Vec<AlertRule> = sqlx::query_as("SELECT * FROM alert_rules ORDER BY created_at DESC")
        .fetch_all(&services.pool)
        .await?;
    Ok(Json(rules))
}

pub async fn create_rule(
    State(services): State<Arc<Services>>,
    user: AuthUser,
    Json(input): Json<AlertRuleInput>,
) -> AppResult<Json<AlertRule>> {
    user.require_write()?;
    validate_cooldown_minutes(input.cooldown_minutes).map_err(AppError::Validation)?;
    if crate::domain::Condition::parse(&input.condition).is_none() {
        return Err(AppError::Validation(format!("unknown condition: {}", input.condition)));
    }

    let rule: AlertRule = sqlx::query_as(
        "INSERT INTO alert_rules (id, name, metric, condition, threshold, ad_account_id, channels, email_to, im_to, cooldown_minutes, is_active, trigger_count, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 0, $12) RETURNING *",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&input.name)
    .bind(&input.metric)
    .bind(&input.condition)
    .bind(input.threshold)
    .bind(&input.ad_account_id)
    .bind(&input.channels)
    .bind(&input.email_to)
    .bind(&input.im_to)
    .bind(input.cooldown_minutes)
    .bind(input.is_active)
    .bind(Utc::now())
    .fetch_one(&services.pool)
    .await?;

    Ok(Json(rule))
}

pub async fn update_rule(
    State(services): State<Arc<Services>>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<AlertRuleInput>,
) -> AppResult<Json<AlertRule>> {
    user.require_write()?;
    validate_cooldown_minutes(input.cooldown_minutes).map_err(AppError::Validation)?;
    if crate::domain::Condition::parse(&input.condition).is_none() {
        return Err(AppError::Validation(format!("unknown condition: {}", input.condition)));
    }

    let rule: AlertRule = sqlx::query_as(
        "UPDATE alert_rules SET name = $1, metric = $2, condition = $3, threshold = $4, ad_account_id = $5, \
         channels = $6, email_to = $7, im_to = $8, cooldown_minutes = $9, is_active = $10 WHERE id = $11 RETURNING *",
    )
    .bind(&input.name)
    .bind(&input.metric)
    .bind(&input.condition)
    .bind(input.threshold)
    .bind(&input.ad_account_id)
    .bind(&input.channels)
    .bind(&input.email_to)
    .bind(&input.im_to)
    .bind(input.cooldown_minutes)
    .bind(input.is_active)
    .bind(&id)
    .fetch_one(&services.pool)
    .await?;

    Ok(Json(rule))
}

pub async fn delete_rule(State(services): State<Arc<Services>>, user: AuthUser, Path(id): Path<String>) -> AppResult<Json<serde_json::Value>> {
    user.require_write()?;
    let result = sqlx::query("DELETE FROM alert_rules WHERE id = $1").bind(&id).execute(&services.pool).await?;
    Ok(Json(serde_json::json!({ "deleted": result.rows_affected() > 0 })))
}

pub async fn toggle_rule(State(services): State<Arc<Services>>, user: AuthUser, Path(id): Path<String>) -> AppResult<Json<AlertRule>> {
    user.require_write()?;
    let rule: AlertRule = sqlx::query_as("UPDATE alert_rules SET is_active = NOT is_active WHERE id = $1 RETURNING *")
        .bind(&id)
        .fetch_one(&services.pool)
        .await?;
    Ok(Json(rule))
}

/// Dry-run: evaluates one rule against a live campaign snapshot without writing
/// `alert_history` or advancing `last_triggered`.
pub async fn test_rule(State(services): State<Arc<Services>>, _user: AuthUser, Path(id): Path<String>) -> AppResult<Json<serde_json::Value>> {
    let rule: AlertRule = sqlx::query_as("SELECT * FROM alert_rules WHERE id = $1")
        .bind(&id)
        .fetch_one(&services.pool)
        .await?;
    let condition = rule.condition().ok_or_else(|| AppError::Validation(format!("unknown condition: {}", rule.condition)))?;
    let campaigns = services.upstream.list_campaigns(1, rule.ad_account_id.as_deref()).await?;
    let matched = find_first_match(&campaigns, &rule.metric, condition, rule.threshold);
    Ok(Json(serde_json::json!({ "would_fire": matched.is_some(), "match": matched })))
}

/// Synchronous evaluation across every active alert rule, bypassing the scheduler's
/// 15-minute cadence for operators who want an immediate check.
pub async fn check_all(State(services): State<Arc<Services>>, user: AuthUser) -> AppResult<Json<serde_json::Value>> {
    user.require_write()?;
    let now = Utc::now();
    let rules: Vec<AlertRule> = sqlx::query_as("SELECT * FROM alert_rules WHERE is_active")
        .fetch_all(&services.pool)
        .await?;

    let mut fired = 0usize;
    for rule in &rules {
        if !alert_rule_eligible(rule, now) {
            continue;
        }
        let Some(condition) = rule.condition() else { continue };
        let campaigns = match services.upstream.list_campaigns(1, rule.ad_account_id.as_deref()).await {
            Ok(campaigns) => campaigns,
            Err(e) => {
                tracing::warn!(rule_id = %rule.id, error = %e, "check-all: failed to fetch campaign snapshot");
                continue;
            }
        };
        if let Some(matched) = find_first_match(&campaigns, &rule.metric, condition, rule.threshold) {
            fire_alert(&services.pool, &services.fanout, rule, &matched, now).await?;
            fired += 1;
        }
    }

    Ok(Json(serde_json::json!({ "rules_checked": rules.len(), "rules_fired": fired })))
}
