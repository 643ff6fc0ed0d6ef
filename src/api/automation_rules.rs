//! `/api/automation/*` — CRUD for automation rules plus the admin-gated toggle/run
//! endpoints. Toggling and manual runs require admin because the underlying actions
//! write back to the paid ad account (pause/resume/budget changes).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::domain::{validate_cooldown_minutes, AutomationRule};
use crate::error::{AppError, AppResult};
use crate::rules::{applicable_campaigns, find_first_match};
use crate::scheduler::fire_automation;
use crate::services::Services;

#[derive(Deserialize)]
pub struct AutomationRuleInput {
    pub name: String,
    pub metric: String,
    pub condition: String,
    pub threshold: f64,
    pub action: String,
    pub action_value_pct: Option<f64>,
    pub ad_account_id: Option<String>,
    pub campaign_ids: serde_json::Value,
    pub cooldown_minutes: i32,
    pub is_active: bool,
}

fn validate_input(input: &AutomationRuleInput) -> Result<(), AppError> {
    validate_cooldown_minutes(input.cooldown_minutes).map_err(AppError::Validation)?;
    if crate::domain::Condition::parse(&input.condition).is_none() {
        return Err(AppError::Validation(format!("unknown condition: {}", input.condition)));
    }
    let action = crate::domain::AutomationAction::parse(&input.action)
        .ok_or_else(|| AppError::Validation(format!("unknown action: {}", input.action)))?;
    if action.is_budget_action() && input.action_value_pct.is_none() {
        return Err(AppError::Validation("action_value_pct is required for budget actions".to_string()));
    }
    Ok(())
}

pub async fn list_rules(State(services): State<Arc<Services>>, _user: AuthUser) -> AppResult<Json<Vec<AutomationRule>>> {
    let rules: Vec<AutomationRule> = sqlx::query_as("SELECT * FROM automation_rules ORDER BY created_at DESC")
        .fetch_all(&services.pool)
        .await?;
    Ok(Json(rules))
}

pub async fn create_rule(
    State(services): State<Arc<Services>>,
    user: AuthUser,
    Json(input): Json<AutomationRuleInput>,
) -> AppResult<Json<AutomationRule>> {
    user.require_write()?;
    validate_input(&input)?;

    let rule: AutomationRule = sqlx::query_as(
        "INSERT INTO automation_rules (id, name, metric, condition, threshold, action, action_value_pct, ad_account_id, campaign_ids, cooldown_minutes, is_active, trigger_count, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 0, $12) RETURNING *",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&input.name)
    .bind(&input.metric)
    .bind(&input.condition)
    .bind(input.threshold)
    .bind(&input.action)
    .bind(input.action_value_pct)
    .bind(&input.ad_account_id)
    .bind(&input.campaign_ids)
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
    Json(input): Json<AutomationRuleInput>,
) -> AppResult<Json<AutomationRule>> {
    user.require_write()?;
    validate_input(&input)?;

    let rule: AutomationRule = sqlx::query_as(
        "UPDATE automation_rules SET name = $1, metric = $2, condition = $3, threshold = $4, action = $5, action_value_pct = $6, \
         ad_account_id = $7, campaign_ids = $8, cooldown_minutes = $9, is_active = $10 WHERE id = $11 RETURNING *",
    )
    .bind(&input.name)
    .bind(&input.metric)
    .bind(&input.condition)
    .bind(input.threshold)
    .bind(&input.action)
    .bind(input.action_value_pct)
    .bind(&input.ad_account_id)
    .bind(&input.campaign_ids)
    .bind(input.cooldown_minutes)
    .bind(input.is_active)
    .bind(&id)
    .fetch_one(&services.pool)
    .await?;

    Ok(Json(rule))
}

pub async fn delete_rule(State(services): State<Arc<Services>>, user: AuthUser, Path(id): Path<String>) -> AppResult<Json<serde_json::Value>> {
    user.require_write()?;
    let result = sqlx::query("DELETE FROM automation_rules WHERE id = $1").bind(&id).execute(&services.pool).await?;
    Ok(Json(serde_json::json!({ "deleted": result.rows_affected() > 0 })))
}

pub async fn toggle_rule(State(services): State<Arc<Services>>, user: AuthUser, Path(id): Path<String>) -> AppResult<Json<AutomationRule>> {
    user.require_admin()?;
    let rule: AutomationRule = sqlx::query_as("UPDATE automation_rules SET is_active = NOT is_active WHERE id = $1 RETURNING *")
        .bind(&id)
        .fetch_one(&services.pool)
        .await?;
    Ok(Json(rule))
}

#[derive(Deserialize)]
pub struct RunQuery {
    #[serde(default)]
    pub dry_run: bool,
}

/// Manual trigger, ignoring cooldown and the rule's `is_active` flag. `dry_run=true`
/// evaluates the match and reports what would happen without writing back to upstream
/// or persisting an `AutomationLog` row.
pub async fn run_rule(
    State(services): State<Arc<Services>>,
    user: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<RunQuery>,
) -> AppResult<Json<serde_json::Value>> {
    user.require_admin()?;
    let rule: AutomationRule = sqlx::query_as("SELECT * FROM automation_rules WHERE id = $1")
        .bind(&id)
        .fetch_one(&services.pool)
        .await?;
    let condition = rule.condition().ok_or_else(|| AppError::Validation(format!("unknown condition: {}", rule.condition)))?;
    let action = rule.action().ok_or_else(|| AppError::Validation(format!("unknown action: {}", rule.action)))?;

    let campaigns = services.upstream.list_campaigns(1, rule.ad_account_id.as_deref()).await?;
    let targeted: Vec<_> = applicable_campaigns(&rule, &campaigns).into_iter().cloned().collect();
    let Some(matched) = find_first_match(&targeted, &rule.metric, condition, rule.threshold) else {
        return Ok(Json(serde_json::json!({ "matched": false })));
    };

    if query.dry_run {
        return Ok(Json(serde_json::json!({
            "matched": true,
            "dry_run": true,
            "campaign_id": matched.campaign_id,
            "campaign_name": matched.campaign_name,
            "actual_value": matched.actual_value,
            "action": action.as_str(),
        })));
    }

    let (success, message, error) =
        fire_automation(&services.pool, &services.upstream, &services.fanout, &rule, &matched, Utc::now()).await?;

    Ok(Json(serde_json::json!({
        "matched": true,
        "dry_run": false,
        "success": success,
        "message": message,
        "error": error,
    })))
}
