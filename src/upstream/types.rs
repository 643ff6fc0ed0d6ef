//! Typed records returned by the Upstream Client, plus the [`Enriched`] wrapper that
//! carries the Metric Enricher's derived fields alongside the raw upstream payload.

use serde::{Deserialize, Serialize};

/// Action types counted as a "conversion" by the Metric Enricher.
pub const CONVERSION_ACTION_TYPES: &[&str] = &[
    "purchase",
    "lead",
    "complete_registration",
    "onsite_conversion.post_save",
    "omni_view_content",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionValue {
    pub action_type: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawInsight {
    pub spend: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub reach: f64,
    pub frequency: f64,
    pub ctr: f64,
    pub cpc: f64,
    pub cpm: f64,
    #[serde(default)]
    pub actions: Vec<ActionValue>,
    #[serde(default)]
    pub action_values: Vec<ActionValue>,
    #[serde(default)]
    pub date_start: Option<String>,
}

/// Derived fields the Metric Enricher attaches to every raw insight: conversions,
/// conversion value, and ROAS. Wrapping rather than mutating keeps the enrichment
/// step visible at the type level instead of being ad-hoc field injection.
#[derive(Debug, Clone, Serialize)]
pub struct Enriched<T> {
    pub raw: T,
    pub conversions: f64,
    pub conversion_value: f64,
    pub roas: f64,
}

impl Enriched<RawInsight> {
    pub fn from_raw(raw: RawInsight) -> Self {
        let conversions = sum_actions(&raw.actions, CONVERSION_ACTION_TYPES);
        let conversion_value = sum_actions(&raw.action_values, &["purchase"]);
        let roas = if raw.spend > 0.0 { conversion_value / raw.spend } else { 0.0 };
        Self {
            raw,
            conversions,
            conversion_value,
            roas,
        }
    }
}

fn sum_actions(actions: &[ActionValue], wanted: &[&str]) -> f64 {
    actions
        .iter()
        .filter(|a| wanted.contains(&a.action_type.as_str()))
        .map(|a| a.value)
        .sum()
}

#[derive(Debug, Clone, Serialize)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub status: String,
    pub objective: Option<String>,
    pub insight: Enriched<RawInsight>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdSet {
    pub id: String,
    pub campaign_id: String,
    pub name: String,
    pub status: String,
    pub daily_budget: Option<i64>,
    pub lifetime_budget: Option<i64>,
    pub insight: Enriched<RawInsight>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Ad {
    pub id: String,
    pub adset_id: String,
    pub name: String,
    pub status: String,
    pub insight: Enriched<RawInsight>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub account_id: String,
    pub insight: Enriched<RawInsight>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyBreakdownRow {
    pub date: String,
    pub insight: Enriched<RawInsight>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakdownRow {
    pub breakdown_value: String,
    pub insight: Enriched<RawInsight>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdAccount {
    pub id: String,
    pub name: String,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CampaignStatus {
    Active,
    Paused,
    Archived,
}

impl CampaignStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CampaignStatus::Active => "ACTIVE",
            CampaignStatus::Paused => "PAUSED",
            CampaignStatus::Archived => "ARCHIVED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_with(spend: f64, actions: Vec<(&str, f64)>, action_values: Vec<(&str, f64)>) -> RawInsight {
        RawInsight {
            spend,
            actions: actions
                .into_iter()
                .map(|(t, v)| ActionValue { action_type: t.to_string(), value: v })
                .collect(),
            action_values: action_values
                .into_iter()
                .map(|(t, v)| ActionValue { action_type: t.to_string(), value: v })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn conversions_sum_whitelisted_action_types_only() {
        let raw = raw_with(
            100.0,
            vec![("purchase", 3.0), ("lead", 2.0), ("like", 99.0)],
            vec![],
        );
        let enriched = Enriched::from_raw(raw);
        assert_eq!(enriched.conversions, 5.0);
    }

    #[test]
    fn conversion_value_sums_purchase_action_values_only() {
        let raw = raw_with(100.0, vec![], vec![("purchase", 250.0), ("lead", 10.0)]);
        let enriched = Enriched::from_raw(raw);
        assert_eq!(enriched.conversion_value, 250.0);
    }

    #[test]
    fn roas_is_zero_when_spend_is_zero() {
        let raw = raw_with(0.0, vec![], vec![("purchase", 100.0)]);
        let enriched = Enriched::from_raw(raw);
        assert_eq!(enriched.roas, 0.0);
    }

    #[test]
    fn roas_divides_conversion_value_by_spend() {
        let raw = raw_with(50.0, vec![], vec![("purchase", 100.0)]);
        let enriched = Enriched::from_raw(raw);
        assert_eq!(enriched.roas, 2.0);
    }
}
