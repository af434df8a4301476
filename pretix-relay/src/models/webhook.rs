use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use validator::Validate;

/// Order notification posted by Pretix.
///
/// Missing or `null` keys fall back to their defaults; a key with the wrong
/// JSON type rejects the whole payload.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct PretixWebhook {
    pub notification_id: i64,
    pub organizer: String,
    pub event: String,
    /// Order code.
    pub code: String,
    /// Dotted action code, e.g. `pretix.event.order.placed`.
    pub action: String,
    #[serde(deserialize_with = "non_empty")]
    pub status: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub email: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub total: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub secret: Option<String>,
}

impl PretixWebhook {
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        decode_object(body)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TestPushRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Device token is required"))]
    pub token: String,
    #[serde(default, deserialize_with = "non_empty")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub message: Option<String>,
}

impl TestPushRequest {
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        decode_object(body)
    }
}

/// Decode a request body that must be a JSON object.
///
/// Derived struct impls also accept sequences, so the shape is checked on the
/// `Value` first. `null` stands for an empty object.
fn decode_object<T: DeserializeOwned>(body: &str) -> Result<T, serde_json::Error> {
    let mut object = match serde_json::from_str::<Value>(body)? {
        Value::Object(object) => object,
        Value::Null => Map::new(),
        other => {
            return Err(serde_json::Error::custom(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            )))
        }
    };
    object.retain(|_, value| !value.is_null());

    serde_json::from_value(Value::Object(object))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
