pub mod activity;
pub mod agent;
pub mod knowledge;
pub mod work;

pub use activity::{ActivityEvent, Component};
pub use agent::{Agent, Lifecycle};
pub use knowledge::{KnowledgeEntry, KnowledgeFact, KnowledgeKey};
pub use work::{SpecialtyRequirement, WorkItem, WorkItemDraft, WorkYield};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AgentId = String;
pub type WorkItemId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Shift {
    A,
    B,
    C,
    Break,
}

impl Shift {
    /// Shifts an agent can be working in.
    pub const ACTIVE: [Shift; 3] = [Shift::A, Shift::B, Shift::C];

    pub fn as_str(&self) -> &str {
        match self {
            Shift::A => "A",
            Shift::B => "B",
            Shift::C => "C",
            Shift::Break => "Break",
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Shift::Break)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Working,
    OnBreak,
}

impl Phase {
    pub fn as_str(&self) -> &str {
        match self {
            Phase::Working => "Working",
            Phase::OnBreak => "OnBreak",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkStatus {
    Pending,
    Claimed,
    Completed,
    Failed,
}

impl WorkStatus {
    pub fn as_str(&self) -> &str {
        match self {
            WorkStatus::Pending => "Pending",
            WorkStatus::Claimed => "Claimed",
            WorkStatus::Completed => "Completed",
            WorkStatus::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkStatus::Completed | WorkStatus::Failed)
    }
}
