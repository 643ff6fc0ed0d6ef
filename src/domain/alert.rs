//! AlertRule and its append-only firing history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metric::Condition;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AlertRule {
    pub id: String,
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
    pub last_triggered: Option<DateTime<Utc>>,
    pub trigger_count: i32,
    pub created_at: DateTime<Utc>,
}

impl AlertRule {
    pub fn condition(&self) -> Option<Condition> {
        Condition::parse(&self.condition)
    }

    /// `now < last_triggered + cooldown_minutes` ⇒ still cooling down.
    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        match self.last_triggered {
            Some(last) => now < last + chrono::Duration::minutes(i64::from(self.cooldown_minutes)),
            None => false,
        }
    }

    pub fn channel_list(&self) -> Vec<String> {
        self.channels
            .as_array()
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AlertHistory {
    pub id: String,
    pub rule_id: String,
    pub campaign_id: Option<String>,
    pub campaign_name: Option<String>,
    pub metric: String,
    pub threshold: f64,
    pub actual_value: f64,
    pub message: String,
    pub channels_delivered: serde_json::Value,
    pub sent_at: DateTime<Utc>,
}

/// Valid cooldown window per the data model: `[5, 1440]` minutes.
pub fn validate_cooldown_minutes(minutes: i32) -> Result<(), String> {
    if (5..=1440).contains(&minutes) {
        Ok(())
    } else {
        Err(format!(
            "cooldown_minutes must be between 5 and 1440, got {minutes}"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn rule_with(last_triggered: Option<DateTime<Utc>>, cooldown: i32) -> AlertRule {
        AlertRule {
            id: "r1".to_string(),
            name: "test".to_string(),
            metric: "ctr".to_string(),
            condition: "lt".to_string(),
            threshold: 5.0,
            ad_account_id: None,
            channels: serde_json::json!([]),
            email_to: None,
            im_to: None,
            cooldown_minutes: cooldown,
            is_active: true,
            last_triggered,
            trigger_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn no_prior_trigger_is_never_in_cooldown() {
        let rule = rule_with(None, 60);
        assert!(!rule.in_cooldown(Utc::now()));
    }

    #[test]
    fn within_window_is_in_cooldown() {
        let now = Utc::now();
        let rule = rule_with(Some(now - Duration::minutes(30)), 60);
        assert!(rule.in_cooldown(now));
    }

    #[test]
    fn past_window_is_not_in_cooldown() {
        let now = Utc::now();
        let rule = rule_with(Some(now - Duration::minutes(61)), 60);
        assert!(!rule.in_cooldown(now));
    }

    #[test]
    fn cooldown_bounds_enforced() {
        assert!(validate_cooldown_minutes(4).is_err());
        assert!(validate_cooldown_minutes(5).is_ok());
        assert!(validate_cooldown_minutes(1440).is_ok());
        assert!(validate_cooldown_minutes(1441).is_err());
    }
}
