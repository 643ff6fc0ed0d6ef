//! The fixed numeric namespace rule formulas and rule conditions evaluate against.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Ctr,
    Roas,
    Spend,
    Cpc,
    Cpm,
    Impressions,
    Clicks,
    Frequency,
}

impl Metric {
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Ctr => "ctr",
            Metric::Roas => "roas",
            Metric::Spend => "spend",
            Metric::Cpc => "cpc",
            Metric::Cpm => "cpm",
            Metric::Impressions => "impressions",
            Metric::Clicks => "clicks",
            Metric::Frequency => "frequency",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ctr" => Some(Metric::Ctr),
            "roas" => Some(Metric::Roas),
            "spend" => Some(Metric::Spend),
            "cpc" => Some(Metric::Cpc),
            "cpm" => Some(Metric::Cpm),
            "impressions" => Some(Metric::Impressions),
            "clicks" => Some(Metric::Clicks),
            "frequency" => Some(Metric::Frequency),
            _ => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Lt,
    Gt,
}

impl Condition {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "lt" => Some(Condition::Lt),
            "gt" => Some(Condition::Gt),
            _ => None,
        }
    }

    /// `match = (condition == lt ∧ value < threshold) ∨ (condition == gt ∧ value > threshold)`
    /// Strictly less/greater: a value equal to the threshold never matches (§8 boundary case).
    pub fn matches(self, value: f64, threshold: f64) -> bool {
        match self {
            Condition::Lt => value < threshold,
            Condition::Gt => value > threshold,
        }
    }
}

/// A flat numeric snapshot for one campaign, keyed by metric name, used both by the
/// built-in `Metric` enum conditions and by the sandboxed formula evaluator in
/// [`crate::rules::formula`].
pub fn metric_namespace(
    ctr: f64,
    roas: f64,
    spend: f64,
    cpc: f64,
    cpm: f64,
    impressions: f64,
    clicks: f64,
    frequency: f64,
    conversions: f64,
    conversion_value: f64,
) -> HashMap<String, f64> {
    HashMap::from([
        ("ctr".to_string(), ctr),
        ("roas".to_string(), roas),
        ("spend".to_string(), spend),
        ("cpc".to_string(), cpc),
        ("cpm".to_string(), cpm),
        ("impressions".to_string(), impressions),
        ("clicks".to_string(), clicks),
        ("frequency".to_string(), frequency),
        ("conversions".to_string(), conversions),
        ("conversion_value".to_string(), conversion_value),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lt_does_not_fire_on_equality() {
        assert!(!Condition::Lt.matches(5.0, 5.0));
    }

    #[test]
    fn gt_does_not_fire_on_equality() {
        assert!(!Condition::Gt.matches(5.0, 5.0));
    }

    #[test]
    fn lt_fires_strictly_below() {
        assert!(Condition::Lt.matches(1.0, 5.0));
        assert!(!Condition::Lt.matches(6.0, 5.0));
    }

    #[test]
    fn gt_fires_strictly_above() {
        assert!(Condition::Gt.matches(6.0, 5.0));
        assert!(!Condition::Gt.matches(1.0, 5.0));
    }

    #[test]
    fn metric_parse_round_trips() {
        for m in [
            Metric::Ctr,
            Metric::Roas,
            Metric::Spend,
            Metric::Cpc,
            Metric::Cpm,
            Metric::Impressions,
            Metric::Clicks,
            Metric::Frequency,
        ] {
            assert_eq!(Metric::parse(m.as_str()), Some(m));
        }
    }
}
