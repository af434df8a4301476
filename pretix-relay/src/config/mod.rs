use secrecy::Secret;
use service_core::config::{self as core_config, flag_var, optional_var, required_var, var_or};
use service_core::error::AppError;

pub const DEFAULT_FCM_TOPIC: &str = "pretix-orders";
pub const DEFAULT_FCM_API_BASE_URL: &str = "https://fcm.googleapis.com";

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub common: core_config::Config,
    pub fcm: FcmConfig,
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone)]
pub struct FcmConfig {
    /// Path to the Google service-account JSON key.
    pub service_account_path: String,
    pub project_id: String,
    /// Topic that webhook notifications are broadcast to.
    pub topic: String,
    pub api_base_url: String,
    /// Use the logging mock provider instead of calling FCM.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default)]
pub struct WebhookConfig {
    /// When set, incoming webhooks must carry this value in their `secret` field.
    pub secret: Option<Secret<String>>,
}

impl RelayConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        Self::from_lookup(common, core_config::process_env)
    }

    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(RelayConfig {
            common,
            fcm: FcmConfig {
                service_account_path: required_var(&lookup, "FCM_SERVICE_ACCOUNT_PATH")?,
                project_id: required_var(&lookup, "FCM_PROJECT_ID")?,
                topic: var_or(&lookup, "FCM_TOPIC", DEFAULT_FCM_TOPIC),
                api_base_url: var_or(&lookup, "FCM_API_BASE_URL", DEFAULT_FCM_API_BASE_URL),
                dry_run: flag_var(&lookup, "FCM_DRY_RUN"),
            },
            webhook: WebhookConfig {
                secret: optional_var(&lookup, "PRETIX_WEBHOOK_SECRET").map(Secret::new),
            },
        })
    }
}
