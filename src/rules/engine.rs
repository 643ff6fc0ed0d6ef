//! Rule Engine — the shared match predicate, cooldown gate, and side-effect ordering for
//! both alert rules and automation rules.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::metric::metric_namespace;
use crate::domain::{AlertRule, AutomationAction, AutomationRule, Condition};
use crate::upstream::{Campaign, Enriched, RawInsight};

use super::formula::evaluate as evaluate_formula;

/// The outcome of evaluating one rule against one campaign's metric snapshot.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MatchResult {
    pub campaign_id: String,
    pub campaign_name: String,
    pub actual_value: f64,
}

fn metric_value_for(campaign: &Campaign, metric_or_formula: &str) -> Option<f64> {
    let insight = &campaign.insight;
    let namespace = metric_namespace(
        insight.raw.ctr,
        insight.roas,
        insight.raw.spend,
        insight.raw.cpc,
        insight.raw.cpm,
        insight.raw.impressions,
        insight.raw.clicks,
        insight.raw.frequency,
        insight.conversions,
        insight.conversion_value,
    );

    if let Some(&direct) = namespace.get(metric_or_formula) {
        return Some(direct);
    }

    evaluate_formula(metric_or_formula, &namespace).ok()
}

/// Evaluates `condition`/`threshold` against every campaign, returning the first match.
/// A rule fires at most once per tick regardless of how many campaigns match (§4.3 step 3).
pub fn find_first_match(
    campaigns: &[Campaign],
    metric_or_formula: &str,
    condition: Condition,
    threshold: f64,
) -> Option<MatchResult> {
    campaigns.iter().find_map(|campaign| {
        let value = metric_value_for(campaign, metric_or_formula)?;
        if condition.matches(value, threshold) {
            Some(MatchResult {
                campaign_id: campaign.id.clone(),
                campaign_name: campaign.name.clone(),
                actual_value: value,
            })
        } else {
            None
        }
    })
}

pub fn alert_rule_eligible(rule: &AlertRule, now: DateTime<Utc>) -> bool {
    rule.is_active && !rule.in_cooldown(now)
}

pub fn automation_rule_eligible(rule: &AutomationRule, now: DateTime<Utc>) -> bool {
    rule.is_active && !rule.in_cooldown(now)
}

/// Filters campaigns down to the ones an automation rule's `campaign_ids` allow-list
/// targets. An empty allow-list targets every campaign in the account.
pub fn applicable_campaigns<'a>(rule: &AutomationRule, campaigns: &'a [Campaign]) -> Vec<&'a Campaign> {
    campaigns.iter().filter(|c| rule.applies_to(&c.id)).collect()
}

/// One adset's budget write-back instruction, computed for a `budget_increase`/`budget_decrease`
/// match. Lifetime-budget adsets are skipped per §4.4 step 1.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetWriteBack {
    pub adset_id: String,
    pub old_daily: i64,
    pub new_daily: i64,
}

pub fn plan_budget_write_backs(
    adsets: &[(String, Option<i64>, Option<i64>)], // (id, daily_budget, lifetime_budget)
    action: AutomationAction,
    pct: f64,
) -> Vec<BudgetWriteBack> {
    let increase = matches!(action, AutomationAction::BudgetIncrease);
    adsets
        .iter()
        .filter_map(|(id, daily, lifetime)| {
            if lifetime.is_some() {
                return None;
            }
            let current = (*daily)?;
            let new_daily = crate::domain::automation::new_daily_budget(current, pct, increase);
            Some(BudgetWriteBack {
                adset_id: id.clone(),
                old_daily: current,
                new_daily,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campaign(id: &str, name: &str, ctr: f64, spend: f64) -> Campaign {
        Campaign {
            id: id.to_string(),
            name: name.to_string(),
            status: "ACTIVE".to_string(),
            objective: None,
            insight: Enriched::from_raw(RawInsight {
                spend,
                ctr,
                ..Default::default()
            }),
        }
    }

    #[test]
    fn finds_first_matching_campaign_by_metric_name() {
        let campaigns = vec![campaign("c1", "Alpha", 3.0, 10.0), campaign("c2", "Beta", 0.5, 10.0)];
        let result = find_first_match(&campaigns, "ctr", Condition::Lt, 1.0).unwrap();
        assert_eq!(result.campaign_id, "c2");
        assert_eq!(result.actual_value, 0.5);
    }

    #[test]
    fn no_match_returns_none() {
        let campaigns = vec![campaign("c1", "Alpha", 3.0, 10.0)];
        assert!(find_first_match(&campaigns, "ctr", Condition::Lt, 1.0).is_none());
    }

    #[test]
    fn evaluates_formula_metrics_too() {
        let campaigns = vec![campaign("c1", "Alpha", 2.0, 50.0)];
        let result = find_first_match(&campaigns, "spend / 2", Condition::Gt, 20.0).unwrap();
        assert_eq!(result.actual_value, 25.0);
    }

    #[test]
    fn budget_write_backs_skip_lifetime_budget_adsets() {
        let adsets = vec![
            ("a1".to_string(), Some(1000i64), None),
            ("a2".to_string(), Some(500), Some(10000)),
        ];
        let plans = plan_budget_write_backs(&adsets, AutomationAction::BudgetIncrease, 10.0);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].adset_id, "a1");
        assert_eq!(plans[0].new_daily, 1100);
    }

    #[test]
    fn budget_write_backs_skip_adsets_without_daily_budget() {
        let adsets = vec![("a1".to_string(), None, None)];
        let plans = plan_budget_write_backs(&adsets, AutomationAction::BudgetDecrease, 10.0);
        assert!(plans.is_empty());
    }
}
