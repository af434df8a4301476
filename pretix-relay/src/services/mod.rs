pub mod format;
pub mod metrics;
pub mod providers;

pub use format::{format_action, notification_body, notification_title};
pub use self::metrics::{get_metrics, init_metrics, record_push, record_webhook};
pub use providers::{
    FcmProvider, MockPushProvider, ProviderError, ProviderResponse, PushMessage, PushProvider,
    PushTarget, ServiceAccountKey,
};
