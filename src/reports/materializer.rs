//! Report Materializer — fetches upstream rows for a template and reshapes them into
//! the template's canonical column order.

use std::collections::HashMap;

use crate::upstream::{BreakdownRow, Campaign, DailyBreakdownRow, Enriched, RawInsight, UpstreamClient, UpstreamError};

use super::templates::{self, DataSource, ReportTemplate};

/// One reshaped row, keyed by the template's column names in declaration order.
pub type MaterializedRow = Vec<(String, String)>;

fn round2(value: f64) -> String {
    format!("{value:.2}")
}

fn cost_per_result(spend: f64, results: f64) -> String {
    if results > 0.0 {
        round2(spend / results)
    } else {
        round2(0.0)
    }
}

fn project(template: &ReportTemplate, fields: &HashMap<&str, String>) -> MaterializedRow {
    template
        .columns
        .iter()
        .map(|&col| (col.to_string(), fields.get(col).cloned().unwrap_or_default()))
        .collect()
}

fn campaign_fields(c: &Campaign) -> HashMap<&'static str, String> {
    let insight = &c.insight;
    HashMap::from([
        ("Campaign Name", c.name.clone()),
        ("Status", c.status.clone()),
        ("Amount Spent", round2(insight.raw.spend)),
        ("Results", round2(insight.conversions)),
        ("Cost Per Result", cost_per_result(insight.raw.spend, insight.conversions)),
        ("CTR", round2(insight.raw.ctr)),
        ("CPM", round2(insight.raw.cpm)),
        ("CPC", round2(insight.raw.cpc)),
        ("ROAS", round2(insight.roas)),
        ("Impressions", round2(insight.raw.impressions)),
        ("Clicks", round2(insight.raw.clicks)),
        ("Reach", round2(insight.raw.reach)),
    ])
}

fn insight_fields(insight: &Enriched<RawInsight>, results_is_suppressed: bool) -> HashMap<&'static str, String> {
    let results = if results_is_suppressed { 0.0 } else { insight.conversions };
    HashMap::from([
        ("Amount Spent", round2(insight.raw.spend)),
        ("Results", round2(results)),
        ("Cost Per Result", cost_per_result(insight.raw.spend, results)),
        ("CTR", round2(insight.raw.ctr)),
        ("CPM", round2(insight.raw.cpm)),
        ("CPC", round2(insight.raw.cpc)),
        ("Impressions", round2(insight.raw.impressions)),
        ("Clicks", round2(insight.raw.clicks)),
        ("Reach", round2(insight.raw.reach)),
    ])
}

pub async fn materialize(
    client: &UpstreamClient,
    template_id: &str,
    window_days: i64,
    account: Option<&str>,
) -> Result<Vec<MaterializedRow>, UpstreamError> {
    let template = templates::find(template_id).ok_or_else(|| UpstreamError::Other {
        status: 404,
        message: format!("unknown report template '{template_id}'"),
    })?;

    match template.data_source {
        DataSource::Campaigns => {
            let campaigns = client.list_campaigns(window_days, account).await?;
            Ok(campaigns.iter().map(|c| project(template, &campaign_fields(c))).collect())
        }
        DataSource::AdSets => {
            let adsets = client.list_adsets(None, window_days, account).await?;
            Ok(adsets
                .iter()
                .map(|a| {
                    let mut fields = insight_fields(&a.insight, false);
                    fields.insert("Ad Set Name", a.name.clone());
                    fields.insert("Delivery Status", a.status.clone());
                    fields.insert("Campaign ID", a.campaign_id.clone());
                    project(template, &fields)
                })
                .collect())
        }
        DataSource::Ads => {
            let ads = client.list_ads(None, window_days, account).await?;
            Ok(ads
                .iter()
                .map(|a| {
                    let mut fields = insight_fields(&a.insight, false);
                    fields.insert("Ad Name", a.name.clone());
                    project(template, &fields)
                })
                .collect())
        }
        DataSource::Daily => {
            let rows = client.get_daily_breakdown(window_days, account).await?;
            Ok(rows.iter().map(|r: &DailyBreakdownRow| {
                let mut fields = insight_fields(&r.insight, false);
                fields.insert("Date", r.date.clone());
                project(template, &fields)
            }).collect())
        }
        DataSource::Breakdown => {
            let breakdown_key = template.breakdown_param.unwrap_or_default();
            let suppressed = breakdown_key == "platform_position";
            let rows = client
                .list_insights_with_breakdown(account, window_days, breakdown_key, None)
                .await?;
            Ok(rows
                .iter()
                .map(|r: &BreakdownRow| {
                    let mut fields = insight_fields(&r.insight, suppressed);
                    let label_column = breakdown_label_column(breakdown_key);
                    fields.insert(label_column, r.breakdown_value.clone());
                    project(template, &fields)
                })
                .collect())
        }
    }
}

fn breakdown_label_column(breakdown_key: &str) -> &'static str {
    match breakdown_key {
        "publisher_platform" => "Platform",
        "age" => "Age",
        "gender" => "Gender",
        "platform_position" => "Placement",
        "device_platform" => "Device",
        "region" => "Region",
        _ => "Breakdown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::{AdSet, CampaignStatus};

    fn raw(spend: f64) -> RawInsight {
        RawInsight { spend, ..Default::default() }
    }

    #[test]
    fn campaign_projection_orders_columns_per_template() {
        let campaign = Campaign {
            id: "c1".to_string(),
            name: "Spring Sale".to_string(),
            status: CampaignStatus::Active.as_str().to_string(),
            objective: None,
            insight: Enriched::from_raw(raw(120.0)),
        };
        let template = templates::find("template_1").unwrap();
        let row = project(template, &campaign_fields(&campaign));
        let keys: Vec<_> = row.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, template.columns);
        assert_eq!(row[0], ("Campaign Name".to_string(), "Spring Sale".to_string()));
    }

    #[test]
    fn cost_per_result_is_zero_when_no_results() {
        assert_eq!(cost_per_result(100.0, 0.0), "0.00");
    }

    #[test]
    fn cost_per_result_divides_spend_by_results() {
        assert_eq!(cost_per_result(100.0, 4.0), "25.00");
    }

    #[test]
    fn adset_fields_carry_campaign_id_and_delivery_status() {
        let adset = AdSet {
            id: "as1".to_string(),
            campaign_id: "c1".to_string(),
            name: "US 18-24".to_string(),
            status: "ACTIVE".to_string(),
            daily_budget: Some(1000),
            lifetime_budget: None,
            insight: Enriched::from_raw(raw(50.0)),
        };
        let mut fields = insight_fields(&adset.insight, false);
        fields.insert("Ad Set Name", adset.name.clone());
        fields.insert("Delivery Status", adset.status.clone());
        fields.insert("Campaign ID", adset.campaign_id.clone());
        let template = templates::find("template_10").unwrap();
        let row = project(template, &fields);
        assert!(row.contains(&("Campaign ID".to_string(), "c1".to_string())));
    }
}
