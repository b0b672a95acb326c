use serde::{Deserialize, Serialize};

use super::{AgentId, Phase, Shift, WorkItemId};

pub const MIN_TIER: u8 = 1;
pub const MAX_TIER: u8 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    id: AgentId,
    tier: u8,
    specialty: String,
    pub shift: Shift,
    pub lifecycle: Lifecycle,
    pub current_work_item: Option<WorkItemId>,
    pub credits: u64,
    pub credits_earned: u64,
    pub credits_spent: u64,
    pub knowledge_contributed: u64,
    pub tasks_completed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lifecycle {
    pub phase: Phase,
    pub hours_in_phase: f64,
    pub max_work_hours: f64,
    pub break_duration: f64,
    pub fatigue: f64,
    pub motivation: f64,
}

impl Lifecycle {
    pub fn fresh(max_work_hours: f64, break_duration: f64, motivation: f64) -> Self {
        Self {
            phase: Phase::Working,
            hours_in_phase: 0.0,
            max_work_hours,
            break_duration,
            fatigue: 0.0,
            motivation: motivation.clamp(0.0, 1.0),
        }
    }
}

impl Agent {
    pub fn new(
        id: impl Into<AgentId>,
        tier: u8,
        specialty: impl Into<String>,
        shift: Shift,
        lifecycle: Lifecycle,
        starting_credits: u64,
    ) -> Self {
        Self {
            id: id.into(),
            tier: tier.clamp(MIN_TIER, MAX_TIER),
            specialty: specialty.into(),
            shift,
            lifecycle,
            current_work_item: None,
            credits: starting_credits,
            credits_earned: 0,
            credits_spent: 0,
            knowledge_contributed: 0,
            tasks_completed: 0,
        }
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn tier(&self) -> u8 {
        self.tier
    }

    pub fn specialty(&self) -> &str {
        &self.specialty
    }

    pub fn role(&self) -> &str {
        match self.tier {
            1 => "Apprentice Technician",
            2 => "Solar Technician",
            3 => "Senior Technician",
            4 => "Solar Systems Specialist",
            5 => "Master Solar Engineer",
            _ => "Solar Technician",
        }
    }

    pub fn is_working(&self) -> bool {
        self.lifecycle.phase == Phase::Working
    }

    pub fn is_on_break(&self) -> bool {
        self.lifecycle.phase == Phase::OnBreak
    }

    /// Working and not holding any work item.
    pub fn is_idle(&self) -> bool {
        self.is_working() && self.current_work_item.is_none()
    }

    pub fn is_knowledgeable(&self) -> bool {
        self.knowledge_contributed > 0
    }
}
