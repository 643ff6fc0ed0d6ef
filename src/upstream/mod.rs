//! Typed wrapper around the external ad-platform HTTP API.

pub mod client;
pub mod error;
pub mod types;

pub use client::UpstreamClient;
pub use error::UpstreamError;
pub use types::{
    AccountSummary, Ad, AdAccount, AdSet, BreakdownRow, Campaign, CampaignStatus,
    DailyBreakdownRow, Enriched, RawInsight,
};
