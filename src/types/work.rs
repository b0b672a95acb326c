use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AgentId, KnowledgeFact, WorkItemId, WorkStatus};

/// How an item's specialty tag constrains which agents may take it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialtyRequirement {
    #[default]
    Any,
    /// Specialists are chosen first; anyone idle otherwise.
    Preferred(String),
    /// Only specialists are eligible.
    Required(String),
}

impl SpecialtyRequirement {
    pub fn tag(&self) -> Option<&str> {
        match self {
            SpecialtyRequirement::Any => None,
            SpecialtyRequirement::Preferred(tag) | SpecialtyRequirement::Required(tag) => {
                Some(tag)
            }
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, SpecialtyRequirement::Required(_))
    }
}

/// What completing an item yields, supplied by the producer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkYield {
    /// Overrides the work type's base credit value.
    #[serde(default)]
    pub base_credits: Option<u64>,
    #[serde(default)]
    pub facts: Vec<KnowledgeFact>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItemDraft {
    pub work_type: String,
    #[serde(default)]
    pub specialty: SpecialtyRequirement,
    #[serde(default)]
    pub output: Option<WorkYield>,
}

impl WorkItemDraft {
    pub fn new(work_type: impl Into<String>) -> Self {
        Self {
            work_type: work_type.into(),
            specialty: SpecialtyRequirement::Any,
            output: None,
        }
    }

    pub fn with_specialty(mut self, specialty: SpecialtyRequirement) -> Self {
        self.specialty = specialty;
        self
    }

    pub fn with_output(mut self, output: WorkYield) -> Self {
        self.output = Some(output);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: WorkItemId,
    pub work_type: String,
    pub specialty: SpecialtyRequirement,
    pub status: WorkStatus,
    pub claimed_by: Option<AgentId>,
    pub output: Option<WorkYield>,
    pub sequence: u64,
    pub enqueued_at: DateTime<Utc>,
    pub claimed_at_hour: Option<f64>,
    pub completes_at_hour: Option<f64>,
    pub deadline_hour: Option<f64>,
    pub attempts: u32,
    pub failure_reason: Option<String>,
}

impl WorkItem {
    pub fn from_draft(draft: WorkItemDraft, sequence: u64) -> Self {
        Self {
            id: WorkItemId::new_v4(),
            work_type: draft.work_type.trim().to_string(),
            specialty: draft.specialty,
            status: WorkStatus::Pending,
            claimed_by: None,
            output: draft.output,
            sequence,
            enqueued_at: Utc::now(),
            claimed_at_hour: None,
            completes_at_hour: None,
            deadline_hour: None,
            attempts: 0,
            failure_reason: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == WorkStatus::Pending
    }

    pub fn is_claimed(&self) -> bool {
        self.status == WorkStatus::Claimed
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }
}
