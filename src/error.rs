use thiserror::Error;

use crate::types::{AgentId, KnowledgeKey, WorkItemId, WorkStatus};

#[derive(Debug, Error)]
pub enum WorkforceError {
    #[error("invalid work item: {0}")]
    InvalidWorkItem(String),

    #[error("work item {item} is already claimed by {holder}")]
    DuplicateClaim { item: WorkItemId, holder: AgentId },

    #[error("work item {item} is {} and cannot be {action}", .status.as_str())]
    InvalidStatus {
        item: WorkItemId,
        status: WorkStatus,
        action: &'static str,
    },

    #[error("agent {agent} has {available} credits, cannot spend {requested}")]
    InsufficientFunds {
        agent: AgentId,
        requested: u64,
        available: u64,
    },

    #[error("crediting {amount} to {agent} would overflow its balance")]
    CreditOverflow { agent: AgentId, amount: u64 },

    #[error("knowledge key {0} already exists")]
    KeyConflict(KnowledgeKey),

    #[error("invalid knowledge key: {0:?}")]
    InvalidKnowledgeKey(String),

    #[error("unknown agent: {0}")]
    UnknownAgent(AgentId),

    #[error("unknown work item: {0}")]
    UnknownWorkItem(WorkItemId),

    #[error("agent {0} cannot take work right now")]
    AgentUnavailable(AgentId),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("unknown purchase: {0}")]
    UnknownPurchase(String),
}

pub type Result<T> = std::result::Result<T, WorkforceError>;
