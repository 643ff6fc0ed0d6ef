//! Ambient process configuration — environment variables and CLI args, resolved once
//! at binary startup. Distinct from [`crate::settings`], which holds operator-editable
//! secrets that live in a JSON file and can change at runtime.

use tracing::warn;

#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Bind address for the API server (e.g. "0.0.0.0:8080").
    pub bind_address: String,
    /// Directory CSV/ZIP/PDF report artifacts are written to.
    pub reports_dir: String,
    /// Path to the Settings Store's JSON file.
    pub settings_file_path: String,
    /// Shared secret used to sign issued JWTs (HS256).
    pub jwt_secret: String,
    /// Worker pool concurrency (max in-flight jobs).
    pub worker_concurrency: usize,
    /// rule_check_tick interval, seconds. Fixed at 900 per the spec; overridable for tests.
    pub rule_check_interval_secs: u64,
    /// scheduled_report_tick interval, seconds. Fixed at 60 per the spec; overridable for tests.
    pub scheduled_report_interval_secs: u64,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            bind_address: "0.0.0.0:8080".to_string(),
            reports_dir: "./data/reports".to_string(),
            settings_file_path: "./data/settings.json".to_string(),
            jwt_secret: String::new(),
            worker_concurrency: 4,
            rule_check_interval_secs: 900,
            scheduled_report_interval_secs: 60,
        }
    }
}

impl ProcessConfig {
    /// Loads configuration from environment variables with CLI overrides.
    ///
    /// Returns an error in release builds when `JWT_SECRET` is not set, preventing the
    /// hub from starting with a publicly known default. In debug builds a warning is
    /// emitted and a development default is used.
    pub fn from_env(
        database_url: Option<String>,
        bind_address: Option<String>,
        port: Option<u16>,
    ) -> anyhow::Result<Self> {
        let mut config = Self::default();

        config.database_url = database_url
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .unwrap_or_default();

        if let Some(addr) = bind_address {
            config.bind_address = addr;
        } else if let Some(p) = port {
            config.bind_address = format!("0.0.0.0:{p}");
        } else if let Ok(addr) = std::env::var("BIND_ADDRESS") {
            config.bind_address = addr;
        }

        if let Ok(dir) = std::env::var("REPORTS_DIR") {
            config.reports_dir = dir;
        }
        if let Ok(path) = std::env::var("SETTINGS_FILE_PATH") {
            config.settings_file_path = path;
        }

        config.jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) => {
                if cfg!(debug_assertions) {
                    warn!("JWT_SECRET not set, using default dev secret — do NOT use in production");
                    "dev-jwt-secret".to_string()
                } else {
                    anyhow::bail!(
                        "JWT_SECRET environment variable is not set. \
                         The hub cannot start in release mode without a signing secret."
                    );
                }
            }
        };

        if let Ok(v) = std::env::var("WORKER_CONCURRENCY") {
            if let Ok(n) = v.parse() {
                config.worker_concurrency = n;
            }
        }
        if let Ok(v) = std::env::var("RULE_CHECK_INTERVAL_SECS") {
            if let Ok(n) = v.parse() {
                config.rule_check_interval_secs = n;
            }
        }
        if let Ok(v) = std::env::var("SCHEDULED_REPORT_INTERVAL_SECS") {
            if let Ok(n) = v.parse() {
                config.scheduled_report_interval_secs = n;
            }
        }

        Ok(config)
    }
}
