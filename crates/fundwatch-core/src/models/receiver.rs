use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Notification receiver served by the portal at `receivers/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receiver {
    pub name: String,
    #[serde(rename = "lineToken", default)]
    pub line_token: Option<String>,
    #[serde(default)]
    pub targets: Vec<ReceiverTarget>,
}

/// A fund a receiver follows. `net_worth` is filled in before notifying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiverTarget {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_worth: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
