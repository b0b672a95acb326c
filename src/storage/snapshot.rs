use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::economy::LedgerTotals;
use crate::error::{Result, WorkforceError};
use crate::knowledge::LocalCache;
use crate::types::agent::{MAX_TIER, MIN_TIER};
use crate::types::{ActivityEvent, Agent, AgentId, KnowledgeEntry, WorkItem, WorkStatus};

pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything needed to resume a workforce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub taken_at: DateTime<Utc>,
    pub clock_hours: f64,
    pub agents: Vec<Agent>,
    pub work_queue: Vec<WorkItem>,
    pub knowledge: Vec<KnowledgeEntry>,
    #[serde(default)]
    pub local_caches: BTreeMap<AgentId, LocalCache>,
    /// Informational only; totals are recomputed from agents on load.
    pub ledger_totals: LedgerTotals,
    #[serde(default)]
    pub activity_feed: Vec<ActivityEvent>,
}

impl Snapshot {
    /// Structural checks that must hold before any state is hydrated.
    pub fn validate(&self) -> Result<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(invalid(format!(
                "unsupported version {} (expected {})",
                self.version, SNAPSHOT_VERSION
            )));
        }
        if !self.clock_hours.is_finite() || self.clock_hours < 0.0 {
            return Err(invalid(format!("bad clock {}", self.clock_hours)));
        }

        let mut ids = HashSet::new();
        for agent in &self.agents {
            if !ids.insert(agent.id().as_str()) {
                return Err(invalid(format!("duplicate agent id {}", agent.id())));
            }
            if !(MIN_TIER..=MAX_TIER).contains(&agent.tier()) {
                return Err(invalid(format!(
                    "agent {} has tier {}",
                    agent.id(),
                    agent.tier()
                )));
            }
            if agent.is_on_break() && agent.current_work_item.is_some() {
                return Err(invalid(format!(
                    "agent {} is on break while holding work",
                    agent.id()
                )));
            }
        }

        let items: BTreeMap<_, _> = self.work_queue.iter().map(|i| (i.id, i)).collect();
        if items.len() != self.work_queue.len() {
            return Err(invalid("duplicate work item ids".to_string()));
        }

        for agent in &self.agents {
            let Some(item_id) = agent.current_work_item else {
                continue;
            };
            match items.get(&item_id) {
                Some(item)
                    if item.status == WorkStatus::Claimed
                        && item.claimed_by.as_ref() == Some(agent.id()) => {}
                _ => {
                    return Err(invalid(format!(
                        "agent {} holds {} which is not claimed by it",
                        agent.id(),
                        item_id
                    )))
                }
            }
        }

        for item in self.work_queue.iter().filter(|i| i.status == WorkStatus::Claimed) {
            let holder = item
                .claimed_by
                .as_ref()
                .and_then(|holder| self.agents.iter().find(|a| a.id() == holder));
            match holder {
                Some(agent) if agent.current_work_item == Some(item.id) => {}
                _ => {
                    return Err(invalid(format!(
                        "claimed item {} has no agent holding it",
                        item.id
                    )))
                }
            }
        }

        Ok(())
    }
}

fn invalid(reason: String) -> WorkforceError {
    WorkforceError::InvalidSnapshot(reason)
}
