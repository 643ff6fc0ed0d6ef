//! Scheduler ("the beat") — a single periodic driver firing two hard-coded ticks
//! (§4.3). Exactly one instance may run per deployment; neither tick takes an explicit
//! lock, so cooldown correctness depends on that single-leader invariant.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::domain::scheduled_report::next_run_at;
use crate::domain::{AlertRule, AutomationAction, AutomationRule, JobKind, Metric, ScheduledReport};
use crate::jobs::JobStore;
use crate::notify::{format_metric_value, AlertPayload, NotificationAdapter, NotificationFanout};
use crate::rules::{
    alert_rule_eligible, applicable_campaigns, automation_rule_eligible, find_first_match,
    plan_budget_write_backs,
};
use crate::upstream::{CampaignStatus, UpstreamClient, UpstreamError};

pub const RULE_CHECK_INTERVAL: Duration = Duration::from_secs(900);
pub const SCHEDULED_REPORT_INTERVAL: Duration = Duration::from_secs(60);

pub struct SchedulerContext<A: NotificationAdapter> {
    pub pool: PgPool,
    pub upstream: UpstreamClient,
    pub fanout: NotificationFanout<A>,
    pub job_store: JobStore,
}

pub async fn run<A: NotificationAdapter>(context: Arc<SchedulerContext<A>>, cancellation: CancellationToken) {
    let mut rule_check = tokio::time::interval(RULE_CHECK_INTERVAL);
    let mut report_check = tokio::time::interval(SCHEDULED_REPORT_INTERVAL);

    loop {
        tokio::select! {
            _ = cancellation.cancelled() => return,
            _ = rule_check.tick() => {
                if let Err(e) = rule_check_tick(&context).await {
                    tracing::error!(error = %e, "rule check tick failed");
                }
            }
            _ = report_check.tick() => {
                if let Err(e) = scheduled_report_tick(&context).await {
                    tracing::error!(error = %e, "scheduled report tick failed");
                }
            }
        }
    }
}

async fn rule_check_tick<A: NotificationAdapter>(context: &SchedulerContext<A>) -> Result<(), sqlx::Error> {
    let now = Utc::now();

    let alert_rules: Vec<AlertRule> = sqlx::query_as("SELECT * FROM alert_rules WHERE is_active")
        .fetch_all(&context.pool)
        .await?;
    let automation_rules: Vec<AutomationRule> = sqlx::query_as("SELECT * FROM automation_rules WHERE is_active")
        .fetch_all(&context.pool)
        .await?;

    let mut accounts: Vec<Option<String>> = alert_rules.iter().map(|r| r.ad_account_id.clone()).collect();
    accounts.extend(automation_rules.iter().map(|r| r.ad_account_id.clone()));
    accounts.sort();
    accounts.dedup();

    let mut snapshots = HashMap::new();
    for account in accounts {
        match context.upstream.list_campaigns(1, account.as_deref()).await {
            Ok(campaigns) => {
                snapshots.insert(account, campaigns);
            }
            Err(e) => {
                tracing::warn!(account = ?account, error = %e, "failed to fetch campaign snapshot, skipping account's rules this tick");
            }
        }
    }

    for rule in &alert_rules {
        if !alert_rule_eligible(rule, now) {
            continue;
        }
        let Some(campaigns) = snapshots.get(&rule.ad_account_id) else { continue };
        let Some(condition) = rule.condition() else { continue };
        if let Some(matched) = find_first_match(campaigns, &rule.metric, condition, rule.threshold) {
            fire_alert(&context.pool, &context.fanout, rule, &matched, now).await?;
        }
    }

    for rule in &automation_rules {
        if !automation_rule_eligible(rule, now) {
            continue;
        }
        let Some(campaigns) = snapshots.get(&rule.ad_account_id) else { continue };
        let Some(condition) = rule.condition() else { continue };
        let targeted = applicable_campaigns(rule, campaigns);
        let targeted_owned: Vec<_> = targeted.into_iter().cloned().collect();
        if let Some(matched) = find_first_match(&targeted_owned, &rule.metric, condition, rule.threshold) {
            fire_automation(&context.pool, &context.upstream, &context.fanout, rule, &matched, now).await?;
        }
    }

    Ok(())
}

/// Renders a rule's threshold and a match's actual value using the metric family's
/// rendering rule, falling back to plain `f64` display for an unrecognized metric name.
fn render_metric_pair(metric: &str, threshold: f64, actual: f64) -> (String, String) {
    match Metric::parse(metric) {
        Some(m) => (format_metric_value(m, threshold), format_metric_value(m, actual)),
        None => (threshold.to_string(), actual.to_string()),
    }
}

/// Dispatches and records an alert firing. Shared between the scheduler's periodic tick
/// and the manual `/api/alerts/check-all` endpoint so the two never diverge in semantics.
pub async fn fire_alert<A: NotificationAdapter>(
    pool: &PgPool,
    fanout: &NotificationFanout<A>,
    rule: &AlertRule,
    matched: &crate::rules::MatchResult,
    now: chrono::DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    let (threshold, actual) = render_metric_pair(&rule.metric, rule.threshold, matched.actual_value);
    let message = format!(
        "Alert '{}': {} {} {} {} (actual {})",
        rule.name, matched.campaign_name, rule.metric, rule.condition, threshold, actual
    );

    let report = fanout
        .dispatch(&AlertPayload {
            title: Some(rule.name.clone()),
            message: message.clone(),
            email_to: rule.email_to.clone(),
            im_to: rule.im_to.clone(),
        })
        .await;

    sqlx::query(
        "INSERT INTO alert_history (id, rule_id, campaign_id, campaign_name, metric, threshold, actual_value, message, channels_delivered, sent_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&rule.id)
    .bind(&matched.campaign_id)
    .bind(&matched.campaign_name)
    .bind(&rule.metric)
    .bind(rule.threshold)
    .bind(matched.actual_value)
    .bind(&message)
    .bind(serde_json::to_value(&report).unwrap_or_default())
    .bind(now)
    .execute(pool)
    .await?;

    sqlx::query("UPDATE alert_rules SET last_triggered = $1, trigger_count = trigger_count + 1 WHERE id = $2")
        .bind(now)
        .bind(&rule.id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Dispatches and records an automation firing. Shared between the scheduler's periodic
/// tick and the manual `/api/automation/rules/{id}/run` endpoint.
pub async fn fire_automation<A: NotificationAdapter>(
    pool: &PgPool,
    upstream: &UpstreamClient,
    fanout: &NotificationFanout<A>,
    rule: &AutomationRule,
    matched: &crate::rules::MatchResult,
    now: chrono::DateTime<Utc>,
) -> Result<(bool, String, Option<String>), sqlx::Error> {
    let Some(action) = rule.action() else { return Ok((false, "rule has no recognized action".to_string(), None)) };
    let action_result = apply_automation_action(upstream, rule, matched, action).await;

    let (success, message, error) = match &action_result {
        Ok(note) => (true, note.clone(), None),
        Err(e) => {
            tracing::warn!(rule_id = %rule.id, error = %e, "automation action failed");
            (false, format!("{action:?} failed for {}", matched.campaign_name), Some(e.to_string()))
        }
    };

    // `notify` carries no write-back; the campaign/threshold crossing itself is the
    // payload, delivered informationally through the same channels as an alert would be.
    if matches!(action, AutomationAction::Notify) {
        let (threshold, actual) = render_metric_pair(&rule.metric, rule.threshold, matched.actual_value);
        let notify_message = format!(
            "Automation '{}': {} {} {} {} (actual {})",
            rule.name, matched.campaign_name, rule.metric, rule.condition, threshold, actual
        );
        fanout
            .dispatch(&AlertPayload {
                title: Some(rule.name.clone()),
                message: notify_message,
                email_to: None,
                im_to: None,
            })
            .await;
    }

    sqlx::query(
        "INSERT INTO automation_log (id, rule_id, campaign_id, campaign_name, action_taken, metric, threshold, actual_value, success, message, error, executed_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&rule.id)
    .bind(&matched.campaign_id)
    .bind(&matched.campaign_name)
    .bind(action.as_str())
    .bind(&rule.metric)
    .bind(rule.threshold)
    .bind(matched.actual_value)
    .bind(success)
    .bind(&message)
    .bind(&error)
    .bind(now)
    .execute(pool)
    .await?;

    sqlx::query("UPDATE automation_rules SET last_triggered = $1, trigger_count = trigger_count + 1 WHERE id = $2")
        .bind(now)
        .bind(&rule.id)
        .execute(pool)
        .await?;

    Ok((success, message, error))
}

pub async fn apply_automation_action(
    upstream: &UpstreamClient,
    rule: &AutomationRule,
    matched: &crate::rules::MatchResult,
    action: AutomationAction,
) -> Result<String, UpstreamError> {
    match action {
        AutomationAction::Pause => {
            upstream.set_campaign_status(&matched.campaign_id, CampaignStatus::Paused).await?;
            Ok(format!("paused {}", matched.campaign_name))
        }
        AutomationAction::Resume => {
            upstream.set_campaign_status(&matched.campaign_id, CampaignStatus::Active).await?;
            Ok(format!("resumed {}", matched.campaign_name))
        }
        AutomationAction::Notify => Ok(format!("notified for {}", matched.campaign_name)),
        AutomationAction::BudgetDecrease | AutomationAction::BudgetIncrease => {
            let Some(pct) = rule.action_value_pct else {
                return Ok("no action_value_pct configured, skipped".to_string());
            };
            let adsets = upstream.list_adsets(Some(&matched.campaign_id), 1, rule.ad_account_id.as_deref()).await?;
            let tuples: Vec<_> = adsets.iter().map(|a| (a.id.clone(), a.daily_budget, a.lifetime_budget)).collect();
            let plans = plan_budget_write_backs(&tuples, action, pct);
            for plan in &plans {
                upstream.update_adset_budget(&plan.adset_id, Some(plan.new_daily), None).await?;
            }
            Ok(format!("adjusted {} adset(s) budget by {pct}%", plans.len()))
        }
    }
}

async fn scheduled_report_tick<A: NotificationAdapter>(context: &SchedulerContext<A>) -> Result<(), sqlx::Error> {
    let now = Utc::now();
    let due: Vec<ScheduledReport> = sqlx::query_as("SELECT * FROM scheduled_reports WHERE is_active AND next_run_at <= $1")
        .bind(now)
        .fetch_all(&context.pool)
        .await?;

    for report in due {
        match context.job_store.enqueue(JobKind::ScheduledReport, &report.id).await {
            Ok(job_id) => tracing::info!(job_id, scheduled_report_id = %report.id, "enqueued scheduled report job"),
            Err(e) => {
                tracing::error!(scheduled_report_id = %report.id, error = %e, "failed to enqueue scheduled report job");
                continue;
            }
        }

        let Some(frequency) = report.frequency() else {
            tracing::warn!(scheduled_report_id = %report.id, frequency = %report.frequency, "unknown frequency, leaving next_run_at unchanged");
            continue;
        };
        let Some(tz) = report.timezone() else {
            tracing::warn!(scheduled_report_id = %report.id, timezone = %report.timezone, "unknown timezone, leaving next_run_at unchanged");
            continue;
        };

        let next = next_run_at(
            frequency,
            report.hour as u32,
            report.minute as u32,
            report.day_of_week.map(|d| d as u32),
            report.day_of_month.map(|d| d as u32),
            tz,
            now,
        );

        sqlx::query("UPDATE scheduled_reports SET next_run_at = $1, last_run_at = $2, run_count = run_count + 1 WHERE id = $3")
            .bind(next)
            .bind(now)
            .bind(&report.id)
            .execute(&context.pool)
            .await?;
    }

    Ok(())
}
