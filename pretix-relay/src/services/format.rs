//! Translation of Pretix webhooks into push notifications.

use super::providers::{PushMessage, PushTarget};
use crate::models::PretixWebhook;
use chrono::Utc;
use std::collections::HashMap;

pub const DEFAULT_TEST_TITLE: &str = "Test FCM Message";
pub const DEFAULT_TEST_BODY: &str = "This is a test message from your webhook service";
pub const TEST_SOURCE: &str = "webhook-test-endpoint";

/// Turn a dotted action code into a readable phrase.
///
/// Only the last segment is used: `"order.placed.require_approval"` becomes
/// `"Require Approval"`.
pub fn format_action(action: &str) -> String {
    let last = action.rsplit('.').next().unwrap_or(action);

    last.replace('_', " ")
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

pub fn notification_title(action: &str) -> String {
    let formatted = format_action(action);
    if formatted.is_empty() {
        "Order".to_string()
    } else {
        format!("Order {}", formatted)
    }
}

pub fn notification_body(webhook: &PretixWebhook) -> String {
    let mut body = format!("Order {} from {}", webhook.code, webhook.event);
    if let Some(status) = &webhook.status {
        body.push_str(&format!(" - {}", status));
    }
    if let Some(total) = &webhook.total {
        body.push_str(&format!(" (Total: {})", total));
    }
    body
}

impl PushMessage {
    /// Topic broadcast describing a Pretix order event.
    pub fn for_webhook(webhook: &PretixWebhook, topic: &str) -> Self {
        let optional = |value: &Option<String>| value.clone().unwrap_or_default();

        let data = HashMap::from([
            (
                "notification_id".to_string(),
                webhook.notification_id.to_string(),
            ),
            ("organizer".to_string(), webhook.organizer.clone()),
            ("event".to_string(), webhook.event.clone()),
            ("action".to_string(), webhook.action.clone()),
            ("order_code".to_string(), webhook.code.clone()),
            ("status".to_string(), optional(&webhook.status)),
            ("total".to_string(), optional(&webhook.total)),
            ("email".to_string(), optional(&webhook.email)),
        ]);

        PushMessage {
            target: PushTarget::Topic(topic.to_string()),
            title: notification_title(&webhook.action),
            body: notification_body(webhook),
            data,
        }
    }

    /// Direct-to-device message used to check that a token can receive pushes.
    pub fn test_message(token: &str, title: Option<&str>, body: Option<&str>) -> Self {
        let data = HashMap::from([
            ("test".to_string(), "true".to_string()),
            ("timestamp".to_string(), Utc::now().timestamp().to_string()),
            ("source".to_string(), TEST_SOURCE.to_string()),
        ]);

        PushMessage {
            target: PushTarget::Token(token.to_string()),
            title: title.unwrap_or(DEFAULT_TEST_TITLE).to_string(),
            body: body.unwrap_or(DEFAULT_TEST_BODY).to_string(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_last_action_segment() {
        assert_eq!(format_action("order.placed.require_approval"), "Require Approval");
        assert_eq!(format_action("pretix.event.order.paid"), "Paid");
        assert_eq!(format_action("pretix.event.order.payment.confirmed"), "Confirmed");
    }

    #[test]
    fn formats_undotted_and_odd_actions() {
        assert_eq!(format_action("canceled"), "Canceled");
        assert_eq!(format_action("ORDER.CHANGED_SECOND"), "Changed Second");
        assert_eq!(format_action("order.__double__underscore"), "Double Underscore");
        assert_eq!(format_action(""), "");
        assert_eq!(format_action("order."), "");
    }

    #[test]
    fn title_prefixes_order() {
        assert_eq!(
            notification_title("order.placed.require_approval"),
            "Order Require Approval"
        );
        assert_eq!(notification_title(""), "Order");
    }

    #[test]
    fn body_includes_optional_status_and_total() {
        let mut webhook = PretixWebhook {
            code: "ABC23".to_string(),
            event: "democon".to_string(),
            ..Default::default()
        };
        assert_eq!(notification_body(&webhook), "Order ABC23 from democon");

        webhook.status = Some("p".to_string());
        assert_eq!(notification_body(&webhook), "Order ABC23 from democon - p");

        webhook.total = Some("42.00".to_string());
        assert_eq!(
            notification_body(&webhook),
            "Order ABC23 from democon - p (Total: 42.00)"
        );

        webhook.status = None;
        assert_eq!(
            notification_body(&webhook),
            "Order ABC23 from democon (Total: 42.00)"
        );
    }

    #[test]
    fn webhook_message_targets_topic_with_data() {
        let webhook = PretixWebhook {
            notification_id: 7,
            organizer: "acme".to_string(),
            event: "democon".to_string(),
            code: "ABC23".to_string(),
            action: "pretix.event.order.placed".to_string(),
            email: Some("guest@example.org".to_string()),
            ..Default::default()
        };

        let message = PushMessage::for_webhook(&webhook, "pretix-orders");

        assert_eq!(message.target, PushTarget::Topic("pretix-orders".to_string()));
        assert_eq!(message.title, "Order Placed");
        assert_eq!(message.data["notification_id"], "7");
        assert_eq!(message.data["order_code"], "ABC23");
        assert_eq!(message.data["email"], "guest@example.org");
        assert_eq!(message.data["status"], "");
        assert_eq!(message.data.len(), 8);
    }

    #[test]
    fn test_message_uses_defaults() {
        let message = PushMessage::test_message("device-token", None, None);

        assert_eq!(message.target, PushTarget::Token("device-token".to_string()));
        assert_eq!(message.title, DEFAULT_TEST_TITLE);
        assert_eq!(message.body, DEFAULT_TEST_BODY);
        assert_eq!(message.data["test"], "true");
        assert_eq!(message.data["source"], TEST_SOURCE);
        assert!(message.data["timestamp"].parse::<i64>().is_ok());
    }

    #[test]
    fn test_message_keeps_custom_text() {
        let message = PushMessage::test_message("device-token", Some("Hello"), Some("World"));
        assert_eq!(message.title, "Hello");
        assert_eq!(message.body, "World");
    }
}
