use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Component that emitted an activity event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Component {
    Registry,
    Lifecycle,
    Scheduler,
    Knowledge,
    Economy,
    Persistence,
    Control,
}

impl Component {
    pub fn as_str(&self) -> &str {
        match self {
            Component::Registry => "registry",
            Component::Lifecycle => "lifecycle",
            Component::Scheduler => "scheduler",
            Component::Knowledge => "knowledge",
            Component::Economy => "economy",
            Component::Persistence => "persistence",
            Component::Control => "control",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub source: Component,
}

impl ActivityEvent {
    pub fn new(message: impl Into<String>, source: Component) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
            source,
        }
    }
}
