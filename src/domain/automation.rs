//! AutomationRule (pause/resume/notify/budget adjustments on campaigns) and its log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metric::Condition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AutomationAction {
    Pause,
    Resume,
    Notify,
    BudgetDecrease,
    BudgetIncrease,
}

impl AutomationAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AutomationAction::Pause => "pause",
            AutomationAction::Resume => "resume",
            AutomationAction::Notify => "notify",
            AutomationAction::BudgetDecrease => "budget_decrease",
            AutomationAction::BudgetIncrease => "budget_increase",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pause" => Some(AutomationAction::Pause),
            "resume" => Some(AutomationAction::Resume),
            "notify" => Some(AutomationAction::Notify),
            "budget_decrease" => Some(AutomationAction::BudgetDecrease),
            "budget_increase" => Some(AutomationAction::BudgetIncrease),
            _ => None,
        }
    }

    pub fn is_budget_action(self) -> bool {
        matches!(self, AutomationAction::BudgetDecrease | AutomationAction::BudgetIncrease)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AutomationRule {
    pub id: String,
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
    pub last_triggered: Option<DateTime<Utc>>,
    pub trigger_count: i32,
    pub created_at: DateTime<Utc>,
}

impl AutomationRule {
    pub fn condition(&self) -> Option<Condition> {
        Condition::parse(&self.condition)
    }

    pub fn action(&self) -> Option<AutomationAction> {
        AutomationAction::parse(&self.action)
    }

    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        match self.last_triggered {
            Some(last) => now < last + chrono::Duration::minutes(i64::from(self.cooldown_minutes)),
            None => false,
        }
    }

    /// Empty list means "applies to every campaign in the account".
    pub fn campaign_id_list(&self) -> Vec<String> {
        self.campaign_ids
            .as_array()
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }

    pub fn applies_to(&self, campaign_id: &str) -> bool {
        let ids = self.campaign_id_list();
        ids.is_empty() || ids.iter().any(|id| id == campaign_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AutomationLog {
    pub id: String,
    pub rule_id: String,
    pub campaign_id: String,
    pub campaign_name: Option<String>,
    pub action_taken: String,
    pub metric: String,
    pub threshold: f64,
    pub actual_value: f64,
    pub success: bool,
    pub message: String,
    pub error: Option<String>,
    pub executed_at: DateTime<Utc>,
}

/// `new_daily = max(floor(current_daily * (1 ± pct/100)), 100)`.
/// `increase` selects `+` for `budget_increase`, `-` for `budget_decrease`.
/// Grounded on the original's `new_budget = max(int(current_budget * factor), 100)`
/// where `factor = 1 - pct/100` (decrease) or `1 + pct/100` (increase).
/// The floor of 100 minor units holds regardless of how deep a decrease would otherwise cut.
pub fn new_daily_budget(current_daily: i64, pct: f64, increase: bool) -> i64 {
    let factor = if increase { 1.0 + pct / 100.0 } else { 1.0 - pct / 100.0 };
    let scaled = (current_daily as f64 * factor).floor() as i64;
    scaled.max(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_increase_scales_up() {
        assert_eq!(new_daily_budget(1000, 20.0, true), 1200);
    }

    #[test]
    fn budget_decrease_scales_down() {
        assert_eq!(new_daily_budget(1000, 20.0, false), 800);
    }

    #[test]
    fn budget_decrease_never_drops_below_floor() {
        assert_eq!(new_daily_budget(150, 90.0, false), 100);
        assert_eq!(new_daily_budget(50, 10.0, false), 100);
    }

    #[test]
    fn budget_math_floors_fractional_results() {
        assert_eq!(new_daily_budget(999, 33.0, false), 669);
    }

    #[test]
    fn action_parse_round_trips() {
        for a in [
            AutomationAction::Pause,
            AutomationAction::Resume,
            AutomationAction::Notify,
            AutomationAction::BudgetDecrease,
            AutomationAction::BudgetIncrease,
        ] {
            assert_eq!(AutomationAction::parse(a.as_str()), Some(a));
        }
    }

    #[test]
    fn empty_campaign_list_applies_to_everything() {
        let rule = AutomationRule {
            id: "a1".to_string(),
            name: "test".to_string(),
            metric: "roas".to_string(),
            condition: "lt".to_string(),
            threshold: 2.0,
            action: "pause".to_string(),
            action_value_pct: None,
            ad_account_id: None,
            campaign_ids: serde_json::json!([]),
            cooldown_minutes: 60,
            is_active: true,
            last_triggered: None,
            trigger_count: 0,
            created_at: Utc::now(),
        };
        assert!(rule.applies_to("any_campaign"));
    }
}
