use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::SimulationConfig;
use crate::economy::EconomyLedger;
use crate::error::{Result, WorkforceError};
use crate::knowledge::{KnowledgeStore, WriteOutcome};
use crate::lifecycle::{ExhaustionLimits, PhaseMachine, WellbeingRates};
use crate::storage::queue::WorkQueue;
use crate::storage::registry::AgentRegistry;
use crate::types::{Agent, AgentId, SpecialtyRequirement, WorkItem, WorkItemId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkEvent {
    Claimed {
        item: WorkItemId,
        agent: AgentId,
        work_type: String,
        specialist: bool,
    },
    Completed {
        item: WorkItemId,
        agent: AgentId,
        work_type: String,
        credits: u64,
        facts_added: usize,
        facts_known: usize,
    },
    Failed {
        item: WorkItemId,
        agent: Option<AgentId>,
        reason: String,
    },
    Released {
        item: WorkItemId,
        agent: AgentId,
    },
}

impl WorkEvent {
    pub fn is_failure(&self) -> bool {
        matches!(self, WorkEvent::Failed { .. })
    }

    pub fn describe(&self) -> String {
        match self {
            WorkEvent::Claimed {
                item,
                agent,
                work_type,
                specialist,
            } => format!(
                "{} picked up {} {}{}",
                agent,
                work_type,
                item,
                if *specialist { " (specialist)" } else { "" }
            ),
            WorkEvent::Completed {
                item,
                agent,
                work_type,
                credits,
                facts_added,
                facts_known,
            } => format!(
                "{} finished {} {}: +{} credits, {} new facts, {} already known",
                agent, work_type, item, credits, facts_added, facts_known
            ),
            WorkEvent::Failed {
                item,
                agent: Some(agent),
                reason,
            } => format!("ERROR: {} failed on {}: {}", agent, item, reason),
            WorkEvent::Failed {
                item,
                agent: None,
                reason,
            } => format!("ERROR: {} failed: {}", item, reason),
            WorkEvent::Released { item, agent } => {
                format!("{} returned {} to the queue", agent, item)
            }
        }
    }
}

/// Pairs idle agents with pending work and settles claimed work.
pub struct Scheduler;

impl Scheduler {
    pub fn is_eligible(agent: &Agent, item: &WorkItem) -> bool {
        if !agent.is_idle() || !item.is_pending() {
            return false;
        }
        match &item.specialty {
            SpecialtyRequirement::Required(tag) => agent.specialty() == tag,
            SpecialtyRequirement::Any | SpecialtyRequirement::Preferred(_) => true,
        }
    }

    /// Idle agents that may take an item. Specialists still needed by a later Required
    /// item are only handed out once nobody else fits.
    fn candidates(
        idle: &[(AgentId, String)],
        specialty: &SpecialtyRequirement,
        reserved: &HashMap<String, usize>,
    ) -> Vec<AgentId> {
        let spare = |tag: &str| {
            let needed = reserved.get(tag).copied().unwrap_or(0);
            needed == 0 || idle.iter().filter(|(_, t)| t == tag).count() > needed
        };
        let pick = |keep: &dyn Fn(&str) -> bool| -> Vec<AgentId> {
            idle.iter()
                .filter(|(_, t)| keep(t))
                .map(|(id, _)| id.clone())
                .collect()
        };

        match specialty {
            SpecialtyRequirement::Required(tag) => pick(&|t| t == tag.as_str()),
            SpecialtyRequirement::Preferred(tag) => {
                let specialists = pick(&|t| t == tag.as_str() && spare(t));
                if !specialists.is_empty() {
                    return specialists;
                }
                let others = pick(&|t| spare(t));
                if !others.is_empty() {
                    return others;
                }
                let specialists = pick(&|t| t == tag.as_str());
                if !specialists.is_empty() {
                    return specialists;
                }
                pick(&|_| true)
            }
            SpecialtyRequirement::Any => {
                let others = pick(&|t| spare(t));
                if others.is_empty() {
                    pick(&|_| true)
                } else {
                    others
                }
            }
        }
    }

    /// One assignment pass: pending items in enqueue order, each handed to a random
    /// candidate drawn from idle agents sorted by id.
    pub fn assign<R: Rng>(
        registry: &mut AgentRegistry,
        queue: &mut WorkQueue,
        config: &SimulationConfig,
        now_hour: f64,
        rng: &mut R,
    ) -> Vec<WorkEvent> {
        let mut idle: Vec<(AgentId, String)> = registry
            .iter()
            .filter(|a| a.is_idle())
            .map(|a| (a.id().clone(), a.specialty().to_string()))
            .collect();
        let pending: Vec<(WorkItemId, SpecialtyRequirement)> = queue
            .pending()
            .map(|item| (item.id, item.specialty.clone()))
            .collect();

        // Required items still ahead in the pass, per tag.
        let mut reserved: HashMap<String, usize> = HashMap::new();
        for (_, specialty) in &pending {
            if let SpecialtyRequirement::Required(tag) = specialty {
                *reserved.entry(tag.clone()).or_default() += 1;
            }
        }

        let mut events = Vec::new();
        for (item_id, specialty) in pending {
            if idle.is_empty() {
                break;
            }
            if let SpecialtyRequirement::Required(tag) = &specialty {
                if let Some(left) = reserved.get_mut(tag) {
                    *left = left.saturating_sub(1);
                }
            }

            let pool = Self::candidates(&idle, &specialty, &reserved);
            if pool.is_empty() {
                continue;
            }
            let chosen = pool[rng.random_range(0..pool.len())].clone();

            match Self::claim(registry, queue, &item_id, &chosen, config, now_hour) {
                Ok(event) => {
                    idle.retain(|(id, _)| id != &chosen);
                    events.push(event);
                }
                Err(e) => log::error!("Assignment of {} to {} failed: {}", item_id, chosen, e),
            }
        }

        events
    }

    /// Claims one item for one agent. Both sides are checked before anything changes.
    pub fn claim(
        registry: &mut AgentRegistry,
        queue: &mut WorkQueue,
        item_id: &WorkItemId,
        agent_id: &str,
        config: &SimulationConfig,
        now_hour: f64,
    ) -> Result<WorkEvent> {
        let item = queue.get(item_id)?;
        let agent = registry.get(agent_id)?;

        // Non-pending items are rejected by the queue itself.
        if item.is_pending() && !Self::is_eligible(agent, item) {
            return Err(WorkforceError::AgentUnavailable(agent_id.to_string()));
        }

        let specialist = item.specialty.tag() == Some(agent.specialty());
        let work_type = item.work_type.clone();
        let profile = config.work_profile(&work_type);
        let processing = profile.processing_hours;
        let deadline = processing * config.deadline_multiplier;

        queue.claim(item_id, agent_id, now_hour, processing, deadline)?;
        registry.get_mut(agent_id)?.current_work_item = Some(*item_id);

        Ok(WorkEvent::Claimed {
            item: *item_id,
            agent: agent_id.to_string(),
            work_type,
            specialist,
        })
    }

    /// Finishes a claimed item: facts go to the shared store and the agent's cache,
    /// credits go to the agent.
    pub fn complete(
        registry: &mut AgentRegistry,
        queue: &mut WorkQueue,
        knowledge: &KnowledgeStore,
        item_id: &WorkItemId,
        config: &SimulationConfig,
    ) -> Result<WorkEvent> {
        let item = queue.get(item_id)?;
        let holder = match (&item.claimed_by, item.is_claimed()) {
            (Some(holder), true) => holder.clone(),
            _ => {
                return Err(WorkforceError::InvalidStatus {
                    item: *item_id,
                    status: item.status,
                    action: "completed",
                })
            }
        };
        let output = item.output.clone().ok_or_else(|| {
            WorkforceError::InvalidWorkItem(format!("{} has no output to complete with", item_id))
        })?;
        let base = output
            .base_credits
            .unwrap_or_else(|| config.work_profile(&item.work_type).base_credits);
        let agent = registry.get(&holder)?;
        let credits = EconomyLedger::credit_for(base, agent.tier()).ok_or_else(|| {
            WorkforceError::CreditOverflow {
                agent: holder.clone(),
                amount: base,
            }
        })?;
        EconomyLedger::can_earn(agent, credits)?;

        let item = queue.complete(item_id)?;

        let mut facts_added = 0;
        let mut facts_known = 0;
        for fact in output.facts {
            match knowledge.write(fact.key.clone(), fact.value.clone(), &holder, false) {
                Ok(WriteOutcome::Inserted) => facts_added += 1,
                Ok(WriteOutcome::Overwritten { .. }) | Err(WorkforceError::KeyConflict(_)) => {
                    facts_known += 1
                }
                Err(e) => {
                    log::warn!("Dropping fact {} from {}: {}", fact.key, item_id, e);
                    continue;
                }
            }
            let canonical = knowledge.read(&fact.key).unwrap_or(fact.value);
            knowledge.learn(&holder, fact.key, canonical);
        }

        let agent = registry.get_mut(&holder)?;
        if agent.current_work_item == Some(*item_id) {
            agent.current_work_item = None;
        }
        agent.tasks_completed += 1;
        agent.knowledge_contributed += facts_added as u64;
        EconomyLedger::earn(
            registry,
            &holder,
            credits,
            &format!("completing {}", item.work_type),
        )?;

        Ok(WorkEvent::Completed {
            item: *item_id,
            agent: holder,
            work_type: item.work_type,
            credits,
            facts_added,
            facts_known,
        })
    }

    /// Terminal failure. The holder, if any, is freed; the item is not retried.
    pub fn fail(
        registry: &mut AgentRegistry,
        queue: &mut WorkQueue,
        item_id: &WorkItemId,
        reason: &str,
    ) -> Result<WorkEvent> {
        let item = queue.fail(item_id, reason)?;
        let holder = item.claimed_by.clone();

        if let Some(holder) = &holder {
            if let Ok(agent) = registry.get_mut(holder) {
                if agent.current_work_item == Some(*item_id) {
                    agent.current_work_item = None;
                }
            }
        }

        Ok(WorkEvent::Failed {
            item: *item_id,
            agent: holder,
            reason: reason.to_string(),
        })
    }

    /// Settles claimed items whose processing time fell inside the window
    /// `(window_start, now]`. Must run before the lifecycle tick of the same window so a
    /// completion only counts when it lands before the holder's break.
    pub fn settle_due(
        registry: &mut AgentRegistry,
        queue: &mut WorkQueue,
        knowledge: &KnowledgeStore,
        config: &SimulationConfig,
        window_start: f64,
        now: f64,
    ) -> (Vec<WorkEvent>, Vec<String>) {
        let due: Vec<(WorkItemId, Option<AgentId>, f64, f64, bool)> = queue
            .claimed()
            .filter_map(|item| {
                let completes_at = item.completes_at_hour?;
                (completes_at <= now).then(|| {
                    (
                        item.id,
                        item.claimed_by.clone(),
                        completes_at,
                        item.deadline_hour.unwrap_or(completes_at),
                        item.has_output(),
                    )
                })
            })
            .collect();

        let mut events = Vec::new();
        let mut errors = Vec::new();

        let rates = WellbeingRates::from_config(config);
        let exhaustion = ExhaustionLimits::from_config(config);

        for (item_id, holder, completes_at, deadline, has_output) in due {
            let cutoff = holder
                .as_deref()
                .and_then(|id| registry.get(id).ok())
                .map(|agent| {
                    window_start + PhaseMachine::hours_until_break(agent, &rates, &exhaustion)
                })
                .unwrap_or(now);
            let horizon = cutoff.min(now);

            let result = if has_output && completes_at <= horizon {
                Self::complete(registry, queue, knowledge, &item_id, config)
            } else if !has_output && deadline <= horizon {
                Self::fail(
                    registry,
                    queue,
                    &item_id,
                    &format!("no output before deadline at hour {:.2}", deadline),
                )
            } else {
                continue;
            };

            match result {
                Ok(event) => events.push(event),
                Err(e) => {
                    log::error!("Settling {} failed: {}", item_id, e);
                    errors.push(format!("{}: {}", item_id, e));
                    // A rejected completion must not pin its holder forever.
                    if has_output {
                        let reason = format!("completion rejected: {}", e);
                        match Self::fail(registry, queue, &item_id, &reason) {
                            Ok(event) => events.push(event),
                            Err(e) => errors.push(format!("{}: {}", item_id, e)),
                        }
                    }
                }
            }
        }

        (events, errors)
    }
}
