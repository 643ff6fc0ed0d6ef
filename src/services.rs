//! Dependency-injection bundle shared by the HTTP API handlers. Adapted from the
//! `HubState` pattern: one struct, constructed once at startup, handed to every
//! handler as `Arc<Services>`.

use std::path::PathBuf;
use std::sync::Arc;

use sqlx::PgPool;

use crate::ai::{self, AiAdapter};
use crate::jobs::JobStore;
use crate::notify::email::SmtpConfig;
use crate::notify::messaging::{MessagingAdapter, MessagingConfig};
use crate::notify::{DefaultNotificationAdapter, NotificationFanout};
use crate::object_storage::{ObjectStorage, ObjectStorageConfig};
use crate::process_config::ProcessConfig;
use crate::settings::SettingsStore;
use crate::upstream::UpstreamClient;

pub struct Services {
    pub pool: PgPool,
    pub jwt_secret: String,
    pub settings: SettingsStore,
    pub job_store: JobStore,
    pub upstream: UpstreamClient,
    pub fanout: NotificationFanout<DefaultNotificationAdapter>,
    pub storage: ObjectStorage,
    pub ai: Arc<dyn AiAdapter>,
    pub reports_dir: PathBuf,
}

impl Services {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        jwt_secret: String,
        settings: SettingsStore,
        job_store: JobStore,
        upstream: UpstreamClient,
        fanout: NotificationFanout<DefaultNotificationAdapter>,
        storage: ObjectStorage,
        ai: Arc<dyn AiAdapter>,
        reports_dir: PathBuf,
    ) -> Arc<Self> {
        Arc::new(Self {
            pool,
            jwt_secret,
            settings,
            job_store,
            upstream,
            fanout,
            storage,
            ai,
            reports_dir,
        })
    }
}

/// Wires every adapter from the Settings Store, one assembly point shared by all
/// three binaries so api-server/worker/scheduler never disagree on how a client
/// is built from settings.
pub async fn bootstrap(config: &ProcessConfig) -> anyhow::Result<Arc<Services>> {
    let pool = crate::db::create_pool(&config.database_url).await?;
    crate::db::run_migrations(&pool).await?;

    let settings = SettingsStore::load(&config.settings_file_path).await;
    let job_store = JobStore::new(pool.clone());

    let upstream = UpstreamClient::new(
        settings.get_or("UPSTREAM_BASE_URL", "https://graph.facebook.com/v19.0"),
        settings.get("UPSTREAM_ACCESS_TOKEN").unwrap_or_default(),
        settings.get("UPSTREAM_AD_ACCOUNT_ID").unwrap_or_default(),
    );

    let fanout = NotificationFanout::new(DefaultNotificationAdapter {
        smtp: SmtpConfig {
            host: settings.get("SMTP_HOST").unwrap_or_default(),
            port: settings.get_or("SMTP_PORT", "587").parse().unwrap_or(587),
            username: settings.get("SMTP_USER").unwrap_or_default(),
            password: settings.get("SMTP_PASSWORD").unwrap_or_default(),
            from: settings.get("SMTP_USER").unwrap_or_default(),
        },
        messaging: MessagingAdapter::new(MessagingConfig {
            phone_id: settings.get("MESSAGING_PHONE_ID").unwrap_or_default(),
            access_token: settings.get("MESSAGING_ACCESS_TOKEN").unwrap_or_default(),
        }),
    });

    let storage = ObjectStorage::new(ObjectStorageConfig {
        endpoint: settings.get_or("OBJECT_STORAGE_ENDPOINT", ""),
        region: settings.get_or("OBJECT_STORAGE_REGION", "us-east-1"),
        bucket: settings.get("OBJECT_STORAGE_BUCKET").unwrap_or_default(),
        access_key: settings.get("OBJECT_STORAGE_ACCESS_KEY").unwrap_or_default(),
        secret_key: settings.get("OBJECT_STORAGE_SECRET_KEY").unwrap_or_default(),
    });

    let ai_adapter = ai::build_adapter(&settings);

    Ok(Services::new(
        pool,
        config.jwt_secret.clone(),
        settings,
        job_store,
        upstream,
        fanout,
        storage,
        ai_adapter,
        PathBuf::from(&config.reports_dir),
    ))
}
