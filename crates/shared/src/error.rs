use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Failure body returned by the directory service.
///
/// `detail` is usually a string, but request validation failures carry a
/// list of `{loc, msg, type}` items instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(Value::String(detail.into())),
        }
    }

    /// Human-readable form of `detail`, if it carries any text.
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::String(text) => (!text.trim().is_empty()).then(|| text.clone()),
            Value::Array(items) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .filter(|msg| !msg.trim().is_empty())
                    .collect();
                (!messages.is_empty()).then(|| messages.join("; "))
            }
            _ => None,
        }
    }
}
