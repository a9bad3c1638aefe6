use serde::{Deserialize, Serialize};

pub use crate::mattermost::{Callback, Update};

/// The closed set of action tags this service ever embeds in a message.
/// Anything else arriving in a callback collapses to `Unknown` rather than
/// failing deserialization.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionKind {
    Ack,
    Ignore,
    Unknown,
}

impl ActionKind {
    pub fn as_tag(self) -> &'static str {
        match self {
            ActionKind::Ack => "ack",
            ActionKind::Ignore => "ignore",
            ActionKind::Unknown => "unknown",
        }
    }
}

impl From<String> for ActionKind {
    fn from(tag: String) -> Self {
        match &*tag {
            "ack" => ActionKind::Ack,
            "ignore" => ActionKind::Ignore,
            _ => ActionKind::Unknown,
        }
    }
}

impl From<ActionKind> for String {
    fn from(kind: ActionKind) -> Self {
        kind.as_tag().into()
    }
}

/// Opaque payload attached to each action at send time and echoed back
/// unmodified by the platform inside the callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionContext {
    pub action: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
}

impl ActionContext {
    pub fn new(action: ActionKind) -> Self {
        Self {
            action,
            duration: None,
        }
    }

    pub fn with_duration(action: ActionKind, duration: i64) -> Self {
        Self {
            action,
            duration: Some(duration),
        }
    }
}
