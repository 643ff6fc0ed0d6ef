//! Upstream Client — typed access to the third-party advertising platform API.

use std::time::Duration;

use serde_json::Value;
use tokio::time::sleep;

use super::error::UpstreamError;
use super::types::{
    AccountSummary, Ad, AdAccount, AdSet, BreakdownRow, Campaign, CampaignStatus,
    DailyBreakdownRow, Enriched, RawInsight,
};

const ORDINARY_TIMEOUT: Duration = Duration::from_secs(30);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);
const INSIGHT_CALL_THROTTLE: Duration = Duration::from_millis(500);

/// Breakdown keys for which the upstream API rejects an `actions`/`action_values` field
/// request alongside the breakdown (§4.1).
const ACTIONLESS_BREAKDOWNS: &[&str] = &["platform_position"];

#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    default_account_id: String,
}

impl UpstreamClient {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>, default_account_id: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(ORDINARY_TIMEOUT)
            .build()
            .expect("failed to build upstream HTTP client");

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            default_account_id: default_account_id.into(),
        }
    }

    fn account(&self, account: Option<&str>) -> Result<String, UpstreamError> {
        let id = account.unwrap_or(&self.default_account_id);
        if id.is_empty() || id == "REPLACE_ME" {
            return Err(UpstreamError::NotConfigured(
                "upstream ad account id is not configured".to_string(),
            ));
        }
        if self.access_token.is_empty() {
            return Err(UpstreamError::NotConfigured(
                "upstream access token is not configured".to_string(),
            ));
        }
        Ok(id.to_string())
    }

    async fn get(&self, path: &str, extra_params: &[(&str, String)]) -> Result<Value, UpstreamError> {
        let mut req = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(&[("access_token", self.access_token.as_str())]);
        for (k, v) in extra_params {
            req = req.query(&[(*k, v.as_str())]);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| UpstreamError::Other {
                status: status.as_u16(),
                message: format!("invalid JSON response: {e}"),
            })
        } else {
            Err(UpstreamError::classify(status.as_u16(), &body))
        }
    }

    async fn post(&self, path: &str, form: &[(&str, String)], timeout: Duration) -> Result<Value, UpstreamError> {
        let mut params: Vec<(&str, String)> = vec![("access_token", self.access_token.clone())];
        params.extend(form.iter().cloned());

        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .timeout(timeout)
            .form(&params)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| UpstreamError::Other {
                status: status.as_u16(),
                message: format!("invalid JSON response: {e}"),
            })
        } else {
            Err(UpstreamError::classify(status.as_u16(), &body))
        }
    }

    fn insight_fields(breakdown_key: Option<&str>) -> &'static str {
        if breakdown_key.is_some_and(|k| ACTIONLESS_BREAKDOWNS.contains(&k)) {
            "spend,impressions,clicks,reach,frequency,ctr,cpc,cpm,date_start"
        } else {
            "spend,impressions,clicks,reach,frequency,ctr,cpc,cpm,date_start,actions,action_values"
        }
    }

    async fn fetch_insight(&self, entity_path: &str, days: i64) -> Result<Enriched<RawInsight>, UpstreamError> {
        let value = self
            .get(
                entity_path,
                &[
                    ("fields", Self::insight_fields(None).to_string()),
                    ("date_preset", format!("last_{days}d")),
                ],
            )
            .await?;
        let raw: RawInsight = first_data_row(&value).unwrap_or_default();
        Ok(Enriched::from_raw(raw))
    }

    pub async fn list_campaigns(&self, days: i64, account: Option<&str>) -> Result<Vec<Campaign>, UpstreamError> {
        let account_id = self.account(account)?;
        let campaigns_raw = self
            .get(
                &format!("/act_{account_id}/campaigns"),
                &[("fields", "id,name,status,objective".to_string())],
            )
            .await?;

        let mut campaigns = Vec::new();
        for entry in data_array(&campaigns_raw) {
            let id = entry["id"].as_str().unwrap_or_default().to_string();
            let insight = self.fetch_insight(&format!("/{id}/insights"), days).await?;
            sleep(INSIGHT_CALL_THROTTLE).await;
            campaigns.push(Campaign {
                id,
                name: entry["name"].as_str().unwrap_or_default().to_string(),
                status: entry["status"].as_str().unwrap_or_default().to_string(),
                objective: entry["objective"].as_str().map(str::to_string),
                insight,
            });
        }
        Ok(campaigns)
    }

    pub async fn list_adsets(&self, campaign_id: Option<&str>, days: i64, account: Option<&str>) -> Result<Vec<AdSet>, UpstreamError> {
        let account_id = self.account(account)?;
        let path = match campaign_id {
            Some(cid) => format!("/{cid}/adsets"),
            None => format!("/act_{account_id}/adsets"),
        };
        let raw = self
            .get(&path, &[("fields", "id,campaign_id,name,status,daily_budget,lifetime_budget".to_string())])
            .await?;

        let mut adsets = Vec::new();
        for entry in data_array(&raw) {
            let id = entry["id"].as_str().unwrap_or_default().to_string();
            let insight = self.fetch_insight(&format!("/{id}/insights"), days).await?;
            sleep(INSIGHT_CALL_THROTTLE).await;
            adsets.push(AdSet {
                id,
                campaign_id: entry["campaign_id"].as_str().unwrap_or_default().to_string(),
                name: entry["name"].as_str().unwrap_or_default().to_string(),
                status: entry["status"].as_str().unwrap_or_default().to_string(),
                daily_budget: entry["daily_budget"].as_str().and_then(|s| s.parse().ok()),
                lifetime_budget: entry["lifetime_budget"].as_str().and_then(|s| s.parse().ok()),
                insight,
            });
        }
        Ok(adsets)
    }

    pub async fn list_ads(&self, adset_id: Option<&str>, days: i64, account: Option<&str>) -> Result<Vec<Ad>, UpstreamError> {
        let account_id = self.account(account)?;
        let path = match adset_id {
            Some(aid) => format!("/{aid}/ads"),
            None => format!("/act_{account_id}/ads"),
        };
        let raw = self.get(&path, &[("fields", "id,adset_id,name,status".to_string())]).await?;

        let mut ads = Vec::new();
        for entry in data_array(&raw) {
            let id = entry["id"].as_str().unwrap_or_default().to_string();
            let insight = self.fetch_insight(&format!("/{id}/insights"), days).await?;
            sleep(INSIGHT_CALL_THROTTLE).await;
            ads.push(Ad {
                id,
                adset_id: entry["adset_id"].as_str().unwrap_or_default().to_string(),
                name: entry["name"].as_str().unwrap_or_default().to_string(),
                status: entry["status"].as_str().unwrap_or_default().to_string(),
                insight,
            });
        }
        Ok(ads)
    }

    pub async fn get_account_summary(&self, days: i64, account: Option<&str>) -> Result<AccountSummary, UpstreamError> {
        let account_id = self.account(account)?;
        let insight = self.fetch_insight(&format!("/act_{account_id}/insights"), days).await?;
        Ok(AccountSummary { account_id, insight })
    }

    pub async fn get_daily_breakdown(&self, days: i64, account: Option<&str>) -> Result<Vec<DailyBreakdownRow>, UpstreamError> {
        let account_id = self.account(account)?;
        let raw = self
            .get(
                &format!("/act_{account_id}/insights"),
                &[
                    ("fields", Self::insight_fields(None).to_string()),
                    ("time_increment", "1".to_string()),
                    ("date_preset", format!("last_{days}d")),
                ],
            )
            .await?;

        Ok(data_array(&raw)
            .into_iter()
            .map(|entry| {
                let raw_insight: RawInsight = serde_json::from_value(entry.clone()).unwrap_or_default();
                DailyBreakdownRow {
                    date: entry["date_start"].as_str().unwrap_or_default().to_string(),
                    insight: Enriched::from_raw(raw_insight),
                }
            })
            .collect())
    }

    pub async fn list_insights_with_breakdown(
        &self,
        account: Option<&str>,
        days: i64,
        breakdown_key: &str,
        increment: Option<&str>,
    ) -> Result<Vec<BreakdownRow>, UpstreamError> {
        let account_id = self.account(account)?;
        let mut params = vec![
            ("fields", Self::insight_fields(Some(breakdown_key)).to_string()),
            ("breakdowns", breakdown_key.to_string()),
            ("date_preset", format!("last_{days}d")),
        ];
        if let Some(inc) = increment {
            params.push(("time_increment", inc.to_string()));
        }
        let raw = self.get(&format!("/act_{account_id}/insights"), &params).await?;

        Ok(data_array(&raw)
            .into_iter()
            .map(|entry| {
                let raw_insight: RawInsight = serde_json::from_value(entry.clone()).unwrap_or_default();
                let breakdown_value = entry
                    .get(breakdown_key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                BreakdownRow {
                    breakdown_value,
                    insight: Enriched::from_raw(raw_insight),
                }
            })
            .collect())
    }

    pub async fn list_ad_accounts(&self) -> Result<Vec<AdAccount>, UpstreamError> {
        if self.access_token.is_empty() {
            return Err(UpstreamError::NotConfigured("upstream access token is not configured".to_string()));
        }
        let raw = self
            .get("/me/adaccounts", &[("fields", "id,name,currency".to_string())])
            .await?;
        Ok(data_array(&raw)
            .into_iter()
            .map(|entry| AdAccount {
                id: entry["id"].as_str().unwrap_or_default().to_string(),
                name: entry["name"].as_str().unwrap_or_default().to_string(),
                currency: entry["currency"].as_str().unwrap_or_default().to_string(),
            })
            .collect())
    }

    pub async fn set_campaign_status(&self, campaign_id: &str, status: CampaignStatus) -> Result<(), UpstreamError> {
        self.account(None)?;
        self.post(&format!("/{campaign_id}"), &[("status", status.as_str().to_string())], ORDINARY_TIMEOUT)
            .await?;
        Ok(())
    }

    /// At least one of `daily`/`lifetime` must be set; caller enforces this invariant.
    pub async fn update_adset_budget(&self, adset_id: &str, daily: Option<i64>, lifetime: Option<i64>) -> Result<(), UpstreamError> {
        self.account(None)?;
        let mut form = Vec::new();
        if let Some(d) = daily {
            form.push(("daily_budget", d.to_string()));
        }
        if let Some(l) = lifetime {
            form.push(("lifetime_budget", l.to_string()));
        }
        self.post(&format!("/{adset_id}"), &form, ORDINARY_TIMEOUT).await?;
        Ok(())
    }

    pub async fn create_campaign(&self, account: &str, name: &str, objective: &str, status: CampaignStatus) -> Result<String, UpstreamError> {
        let value = self
            .post(
                &format!("/act_{account}/campaigns"),
                &[
                    ("name", name.to_string()),
                    ("objective", objective.to_string()),
                    ("status", status.as_str().to_string()),
                ],
                ORDINARY_TIMEOUT,
            )
            .await?;
        Ok(value["id"].as_str().unwrap_or_default().to_string())
    }

    pub async fn create_adset(&self, account: &str, campaign_id: &str, name: &str, daily_budget: i64, status: CampaignStatus) -> Result<String, UpstreamError> {
        let value = self
            .post(
                &format!("/act_{account}/adsets"),
                &[
                    ("campaign_id", campaign_id.to_string()),
                    ("name", name.to_string()),
                    ("daily_budget", daily_budget.to_string()),
                    ("status", status.as_str().to_string()),
                ],
                ORDINARY_TIMEOUT,
            )
            .await?;
        Ok(value["id"].as_str().unwrap_or_default().to_string())
    }

    pub async fn upload_image(&self, account: &str, url: &str) -> Result<String, UpstreamError> {
        let value = self
            .post(&format!("/act_{account}/adimages"), &[("url", url.to_string())], UPLOAD_TIMEOUT)
            .await?;
        Ok(value["images"]["hash"].as_str().unwrap_or_default().to_string())
    }

    pub async fn upload_video(&self, account: &str, url: &str, title: Option<&str>) -> Result<String, UpstreamError> {
        let mut form = vec![("file_url", url.to_string())];
        if let Some(t) = title {
            form.push(("title", t.to_string()));
        }
        let value = self.post(&format!("/act_{account}/advideos"), &form, UPLOAD_TIMEOUT).await?;
        Ok(value["id"].as_str().unwrap_or_default().to_string())
    }

    pub async fn create_creative(&self, account: &str, name: &str, object_story_spec: &Value) -> Result<String, UpstreamError> {
        let value = self
            .post(
                &format!("/act_{account}/adcreatives"),
                &[("name", name.to_string()), ("object_story_spec", object_story_spec.to_string())],
                ORDINARY_TIMEOUT,
            )
            .await?;
        Ok(value["id"].as_str().unwrap_or_default().to_string())
    }

    pub async fn create_ad(&self, account: &str, adset_id: &str, creative_id: &str, name: &str, status: CampaignStatus) -> Result<String, UpstreamError> {
        let value = self
            .post(
                &format!("/act_{account}/ads"),
                &[
                    ("adset_id", adset_id.to_string()),
                    ("creative", serde_json::json!({"creative_id": creative_id}).to_string()),
                    ("name", name.to_string()),
                    ("status", status.as_str().to_string()),
                ],
                ORDINARY_TIMEOUT,
            )
            .await?;
        Ok(value["id"].as_str().unwrap_or_default().to_string())
    }

    pub async fn search_ads_library(
        &self,
        country: &str,
        query: Option<&str>,
        page_id: Option<&str>,
        after: Option<&str>,
    ) -> Result<Value, UpstreamError> {
        let mut params = vec![("ad_reached_countries", format!("[\"{country}\"]"))];
        if let Some(q) = query {
            params.push(("search_terms", q.to_string()));
        }
        if let Some(p) = page_id {
            params.push(("search_page_ids", format!("[\"{p}\"]")));
        }
        if let Some(cursor) = after {
            params.push(("after", cursor.to_string()));
        }
        self.get("/ads_archive", &params).await
    }
}

fn data_array(value: &Value) -> Vec<Value> {
    value
        .get("data")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn first_data_row(value: &Value) -> Option<RawInsight> {
    data_array(value).into_iter().next().and_then(|row| serde_json::from_value(row).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_account_is_not_configured() {
        let client = UpstreamClient::new("https://graph.example.com", "token", "");
        assert!(matches!(client.account(None), Err(UpstreamError::NotConfigured(_))));
    }

    #[test]
    fn missing_token_is_not_configured() {
        let client = UpstreamClient::new("https://graph.example.com", "", "123");
        assert!(matches!(client.account(None), Err(UpstreamError::NotConfigured(_))));
    }

    #[test]
    fn configured_account_resolves() {
        let client = UpstreamClient::new("https://graph.example.com", "token", "123");
        assert_eq!(client.account(None).unwrap(), "123");
        assert_eq!(client.account(Some("999")).unwrap(), "999");
    }

    #[test]
    fn platform_position_breakdown_omits_action_fields() {
        let fields = UpstreamClient::insight_fields(Some("platform_position"));
        assert!(!fields.contains("actions"));
        let default_fields = UpstreamClient::insight_fields(None);
        assert!(default_fields.contains("actions"));
    }
}
