//! Prometheus metrics for the relay.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder. Call once, from `main`.
pub fn init_metrics() -> Result<(), anyhow::Error> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {}", e))?;

    METRICS_HANDLE
        .set(handle)
        .map_err(|_| anyhow::anyhow!("metrics handle already initialized"))
}

/// Metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Last segments of the Pretix order actions a webhook can carry.
const KNOWN_ACTIONS: &[&str] = &[
    "placed",
    "require_approval",
    "paid",
    "canceled",
    "reactivated",
    "expired",
    "expirychanged",
    "modified",
    "changed",
    "approved",
    "denied",
    "deleted",
    "confirmed",
    "created",
    "done",
    "reverted",
];

/// Metric label for a webhook action. Unknown actions share `"other"` so
/// callers cannot mint new series.
pub fn action_label(action: &str) -> &'static str {
    let last = action.rsplit('.').next().unwrap_or(action);
    KNOWN_ACTIONS
        .iter()
        .find(|known| **known == last)
        .copied()
        .unwrap_or("other")
}

pub fn record_webhook(action: &str) {
    counter!("pretix_webhooks_total", "action" => action_label(action)).increment(1);
}

pub fn record_push(target_kind: &'static str, status: &'static str) {
    counter!("push_sends_total", "target" => target_kind, "status" => status).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_label_uses_known_last_segment() {
        assert_eq!(action_label("pretix.event.order.paid"), "paid");
        assert_eq!(
            action_label("pretix.event.order.placed.require_approval"),
            "require_approval"
        );
        assert_eq!(action_label("canceled"), "canceled");
    }

    #[test]
    fn action_label_collapses_unknown_actions() {
        assert_eq!(action_label(""), "other");
        assert_eq!(action_label("pretix.event.order.zz-attacker-1234"), "other");
        assert_eq!(action_label("Paid"), "other");
    }
}
