//! Ad Ops Hub: orchestration engine for a paid-advertising operational control plane.
//!
//! ## Architecture
//!
//! - **Upstream**: typed client against the external ad platform's HTTP API.
//! - **Jobs**: durable job store + bounded worker pool (export, analyze, archive, scheduled report).
//! - **Rules**: alert and automation rule evaluation, cooldown enforcement, write-back actions.
//! - **Scheduler**: periodic drivers for rule checks and scheduled-report dispatch.
//! - **Reports**: the fixed report template catalog and materializer.
//! - **Notify**: multi-channel notification fanout.
//! - **Webhook**: HMAC-verified callback ingestion from the upstream.
//! - **Ai**: pluggable analysis-text adapter with a deterministic rule-based fallback.
//! - **Api**: the bearer-authenticated Axum surface tying the above together.

pub mod error;
pub mod process_config;
pub mod settings;
pub mod db;
pub mod auth;
pub mod domain;
pub mod upstream;
pub mod jobs;
pub mod reports;
pub mod rules;
pub mod scheduler;
pub mod notify;
pub mod webhook;
pub mod ai;
pub mod pdf;
pub mod object_storage;
pub mod api;
pub mod services;

pub use error::AppError;
pub use services::Services;
