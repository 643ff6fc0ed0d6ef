//! Per-metric-family rendering rules for alert message bodies (§4.5).

use crate::domain::Metric;

/// Percentage-family metrics render as `x.xx%`.
pub fn format_percent(value: f64) -> String {
    format!("{value:.2}%")
}

/// Currency-family metrics render with two decimal places of the minor unit.
pub fn format_currency(value: f64) -> String {
    format!("{value:.2}")
}

/// Ratio-family metrics (ROAS) render with three decimal places.
pub fn format_ratio(value: f64) -> String {
    format!("{value:.3}")
}

/// Formats a metric's value using the rendering rule for its family.
pub fn format_metric_value(metric: Metric, value: f64) -> String {
    match metric {
        Metric::Ctr | Metric::Frequency => format_percent(value),
        Metric::Roas => format_ratio(value),
        Metric::Spend | Metric::Cpc | Metric::Cpm => format_currency(value),
        Metric::Impressions | Metric::Clicks => format!("{value:.0}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_renders_two_decimals_with_suffix() {
        assert_eq!(format_percent(1.5), "1.50%");
    }

    #[test]
    fn currency_renders_two_decimals_no_suffix() {
        assert_eq!(format_currency(99.9), "99.90");
    }

    #[test]
    fn ratio_renders_three_decimals() {
        assert_eq!(format_ratio(2.5), "2.500");
    }

    #[test]
    fn metric_family_selects_the_right_rendering() {
        assert_eq!(format_metric_value(Metric::Ctr, 1.234), "1.23%");
        assert_eq!(format_metric_value(Metric::Roas, 2.0), "2.000");
        assert_eq!(format_metric_value(Metric::Spend, 10.0), "10.00");
    }
}
