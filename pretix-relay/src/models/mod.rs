pub mod webhook;

pub use webhook::{PretixWebhook, TestPushRequest};
