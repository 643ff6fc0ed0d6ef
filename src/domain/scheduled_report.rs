//! ScheduledReport recurrence and the delivery log it produces.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(Frequency::Daily),
            "weekly" => Some(Frequency::Weekly),
            "monthly" => Some(Frequency::Monthly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScheduledReport {
    pub id: String,
    pub name: String,
    pub report_kind: String,
    pub template_ids: serde_json::Value,
    pub window_days: i32,
    pub ad_account_id: Option<String>,
    pub frequency: String,
    pub hour: i32,
    pub minute: i32,
    pub day_of_week: Option<i32>,
    pub day_of_month: Option<i32>,
    pub timezone: String,
    pub channels: serde_json::Value,
    pub email_to: Option<String>,
    pub im_to: Option<String>,
    pub is_active: bool,
    pub next_run_at: DateTime<Utc>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub run_count: i32,
    pub created_at: DateTime<Utc>,
}

impl ScheduledReport {
    pub fn channel_list(&self) -> Vec<String> {
        self.channels
            .as_array()
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }

    pub fn template_id_list(&self) -> Vec<String> {
        self.template_ids
            .as_array()
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }

    pub fn frequency(&self) -> Option<Frequency> {
        Frequency::parse(&self.frequency)
    }

    pub fn timezone(&self) -> Option<Tz> {
        self.timezone.parse().ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScheduledReportLog {
    pub id: String,
    pub scheduled_report_id: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub summary_data: Option<serde_json::Value>,
    pub analysis_text: Option<String>,
    pub error_message: Option<String>,
    pub channels_delivered: serde_json::Value,
}

/// Computes the next instant `>= after` at which this report's recurrence fires,
/// evaluated in the report's own timezone then converted back to UTC.
///
/// Daily: the next occurrence of `hour:minute` local time.
/// Weekly: the next occurrence of `day_of_week` (0 = Sunday) at `hour:minute`.
/// Monthly: the next occurrence of `day_of_month` at `hour:minute`, clamped to the
/// last day of a shorter month (e.g. `day_of_month = 31` on February resolves to the 28th/29th).
///
/// Idempotent in the sense required by the design document: feeding the result back in as
/// `after` (shifted forward by at least a second) always advances rather than repeating.
pub fn next_run_at(
    frequency: Frequency,
    hour: u32,
    minute: u32,
    day_of_week: Option<u32>,
    day_of_month: Option<u32>,
    tz: Tz,
    after: DateTime<Utc>,
) -> DateTime<Utc> {
    let local_after = after.with_timezone(&tz);

    let candidate_today = tz
        .with_ymd_and_hms(
            local_after.year(),
            local_after.month(),
            local_after.day(),
            hour,
            minute,
            0,
        )
        .single();

    match frequency {
        Frequency::Daily => {
            let mut candidate = candidate_today.unwrap_or(local_after);
            if candidate <= local_after {
                candidate += chrono::Duration::days(1);
            }
            candidate.with_timezone(&Utc)
        }
        Frequency::Weekly => {
            let target_dow = day_of_week.unwrap_or(0) % 7;
            let mut candidate = candidate_today.unwrap_or(local_after);
            let current_dow = candidate.weekday().num_days_from_sunday();
            let mut days_ahead = (target_dow + 7 - current_dow) % 7;
            if days_ahead == 0 && candidate <= local_after {
                days_ahead = 7;
            }
            candidate += chrono::Duration::days(i64::from(days_ahead));
            candidate.with_timezone(&Utc)
        }
        Frequency::Monthly => {
            let target_dom = day_of_month.unwrap_or(1).max(1);
            let mut year = local_after.year();
            let mut month = local_after.month();
            loop {
                let dom = clamp_day_of_month(year, month, target_dom);
                if let Some(candidate) = tz.with_ymd_and_hms(year, month, dom, hour, minute, 0).single() {
                    if candidate > local_after {
                        return candidate.with_timezone(&Utc);
                    }
                }
                if month == 12 {
                    month = 1;
                    year += 1;
                } else {
                    month += 1;
                }
            }
        }
    }
}

fn clamp_day_of_month(year: i32, month: u32, day: u32) -> u32 {
    let days_in_month = days_in_month(year, month);
    day.min(days_in_month)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let first_of_next = chrono::NaiveDate::from_ymd_opt(next_year, next_month, 1).expect("valid month");
    let first_of_this = chrono::NaiveDate::from_ymd_opt(year, month, 1).expect("valid month");
    (first_of_next - first_of_this).num_days() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::UTC;

    #[test]
    fn daily_rolls_to_tomorrow_when_time_has_passed() {
        let after = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let next = next_run_at(Frequency::Daily, 9, 0, None, None, UTC, after);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap());
    }

    #[test]
    fn daily_fires_later_today_when_time_has_not_passed() {
        let after = Utc.with_ymd_and_hms(2026, 3, 1, 5, 0, 0).unwrap();
        let next = next_run_at(Frequency::Daily, 9, 0, None, None, UTC, after);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
    }

    #[test]
    fn weekly_finds_next_matching_weekday() {
        // 2026-03-01 is a Sunday.
        let after = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        // day_of_week = 3 (Wednesday)
        let next = next_run_at(Frequency::Weekly, 9, 0, Some(3), None, UTC, after);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 4, 9, 0, 0).unwrap());
    }

    #[test]
    fn weekly_same_day_but_time_passed_rolls_a_full_week() {
        let after = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(); // Sunday
        let next = next_run_at(Frequency::Weekly, 9, 0, Some(0), None, UTC, after);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 8, 9, 0, 0).unwrap());
    }

    #[test]
    fn monthly_clamps_to_shorter_month() {
        let after = Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap();
        let next = next_run_at(Frequency::Monthly, 9, 0, None, Some(31), UTC, after);
        // February 2026 has 28 days.
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 2, 28, 9, 0, 0).unwrap());
    }

    #[test]
    fn monthly_rolls_to_next_month_when_day_has_passed() {
        let after = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
        let next = next_run_at(Frequency::Monthly, 9, 0, None, Some(10), UTC, after);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 4, 10, 9, 0, 0).unwrap());
    }

    #[test]
    fn recurrence_is_idempotent_when_reapplied_past_the_result() {
        let after = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let first = next_run_at(Frequency::Daily, 9, 0, None, None, UTC, after);
        let second = next_run_at(Frequency::Daily, 9, 0, None, None, UTC, first + chrono::Duration::seconds(1));
        assert_eq!(second, first + chrono::Duration::days(1));
    }

    #[test]
    fn frequency_parse_round_trips() {
        for f in [Frequency::Daily, Frequency::Weekly, Frequency::Monthly] {
            assert_eq!(Frequency::parse(f.as_str()), Some(f));
        }
    }
}
