//! The fixed 15-template report catalog (§4.7).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Campaigns,
    AdSets,
    Ads,
    Daily,
    Breakdown,
}

#[derive(Debug, Clone, Copy)]
pub struct ReportTemplate {
    pub id: &'static str,
    pub title: &'static str,
    pub data_source: DataSource,
    pub breakdown_param: Option<&'static str>,
    pub columns: &'static [&'static str],
}

pub const TEMPLATES: &[ReportTemplate] = &[
    ReportTemplate {
        id: "template_1",
        title: "Lowest-cost-per-result campaigns",
        data_source: DataSource::Campaigns,
        breakdown_param: None,
        columns: &["Campaign Name", "Amount Spent", "Results", "Cost Per Result", "Status"],
    },
    ReportTemplate {
        id: "template_2",
        title: "Platform comparison (Facebook/Instagram)",
        data_source: DataSource::Breakdown,
        breakdown_param: Some("publisher_platform"),
        columns: &["Platform", "Results", "Amount Spent", "CTR", "Impressions", "Clicks"],
    },
    ReportTemplate {
        id: "template_3",
        title: "Age-group engagement",
        data_source: DataSource::Breakdown,
        breakdown_param: Some("age"),
        columns: &["Age", "Clicks", "CTR", "Cost Per Result", "Amount Spent", "Results"],
    },
    ReportTemplate {
        id: "template_4",
        title: "Gender performance gap",
        data_source: DataSource::Breakdown,
        breakdown_param: Some("gender"),
        columns: &["Gender", "Reach", "Results", "Amount Spent", "Impressions", "Clicks"],
    },
    ReportTemplate {
        id: "template_5",
        title: "Best-performing ad creative",
        data_source: DataSource::Ads,
        breakdown_param: None,
        columns: &["Ad Name", "CTR", "Results", "CPM", "Amount Spent", "Impressions", "Clicks"],
    },
    ReportTemplate {
        id: "template_6",
        title: "Placement efficiency",
        data_source: DataSource::Breakdown,
        breakdown_param: Some("platform_position"),
        columns: &["Placement", "Impressions", "Clicks", "CPC", "Cost Per Result", "Amount Spent"],
    },
    ReportTemplate {
        id: "template_7",
        title: "Device conversion comparison",
        data_source: DataSource::Breakdown,
        breakdown_param: Some("device_platform"),
        columns: &["Device", "Results", "Clicks", "Amount Spent", "Impressions", "CTR"],
    },
    ReportTemplate {
        id: "template_8",
        title: "Performance over time",
        data_source: DataSource::Daily,
        breakdown_param: None,
        columns: &["Date", "Amount Spent", "Results", "Cost Per Result", "Impressions", "Clicks", "CTR"],
    },
    ReportTemplate {
        id: "template_9",
        title: "Region audience quality",
        data_source: DataSource::Breakdown,
        breakdown_param: Some("region"),
        columns: &["Region", "Reach", "Results", "Amount Spent", "Impressions", "Clicks", "CTR"],
    },
    ReportTemplate {
        id: "template_10",
        title: "Ad-set budget efficiency",
        data_source: DataSource::AdSets,
        breakdown_param: None,
        columns: &["Ad Set Name", "Amount Spent", "Results", "Cost Per Result", "Delivery Status", "Campaign ID"],
    },
    ReportTemplate {
        id: "template_11",
        title: "Quality & relevance",
        data_source: DataSource::Campaigns,
        breakdown_param: None,
        columns: &["Campaign Name", "Amount Spent", "CTR", "CPM", "ROAS", "Impressions", "Clicks", "Status"],
    },
    ReportTemplate {
        id: "template_12",
        title: "Video performance",
        data_source: DataSource::Ads,
        breakdown_param: None,
        columns: &["Ad Name", "Amount Spent", "Impressions", "Clicks", "CTR", "CPM", "Results"],
    },
    ReportTemplate {
        id: "template_13",
        title: "Messaging metrics",
        data_source: DataSource::Campaigns,
        breakdown_param: None,
        columns: &["Campaign Name", "Amount Spent", "Results", "Impressions", "Clicks", "CTR"],
    },
    ReportTemplate {
        id: "template_14",
        title: "Engagement depth",
        data_source: DataSource::Campaigns,
        breakdown_param: None,
        columns: &["Campaign Name", "Amount Spent", "Impressions", "Clicks", "CTR", "Reach", "Results"],
    },
    ReportTemplate {
        id: "template_15",
        title: "Cost efficiency",
        data_source: DataSource::Campaigns,
        breakdown_param: None,
        columns: &["Campaign Name", "CPM", "CPC", "Amount Spent", "CTR", "Impressions", "Clicks", "ROAS"],
    },
];

pub fn find(id: &str) -> Option<&'static ReportTemplate> {
    TEMPLATES.iter().find(|t| t.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_exactly_fifteen_templates() {
        assert_eq!(TEMPLATES.len(), 15);
    }

    #[test]
    fn template_ids_are_unique() {
        let mut ids: Vec<_> = TEMPLATES.iter().map(|t| t.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), TEMPLATES.len());
    }

    #[test]
    fn find_resolves_known_template() {
        assert_eq!(find("template_8").unwrap().data_source, DataSource::Daily);
    }

    #[test]
    fn find_returns_none_for_unknown_id() {
        assert!(find("template_99").is_none());
    }

    #[test]
    fn platform_position_breakdown_carries_its_param() {
        let t = find("template_6").unwrap();
        assert_eq!(t.breakdown_param, Some("platform_position"));
    }
}
