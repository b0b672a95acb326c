use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::propagation::{propagate, PropagationOutcome};
use super::scheduler::{Scheduler, WorkEvent};
use crate::activity::{ActivityFeed, Progress};
use crate::config::SimulationConfig;
use crate::economy::{purchases, EconomyLedger, LedgerReceipt, LedgerTotals};
use crate::error::Result;
use crate::knowledge::{KnowledgeStore, QueryResult, WriteOutcome};
use crate::lifecycle::shifts::shift_summary;
use crate::lifecycle::{
    pick_return_shift, plan_rotation, ExhaustionLimits, LifecycleEvent, PhaseMachine,
    Transition, WellbeingRates,
};
use crate::storage::queue::WorkQueue;
use crate::storage::registry::AgentRegistry;
use crate::storage::snapshot::{Snapshot, SNAPSHOT_VERSION};
use crate::types::{
    ActivityEvent, Agent, Component, KnowledgeKey, WorkItem, WorkItemDraft, WorkItemId,
    WorkYield,
};

/// What one step did, in the order it happened.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub clock_hours: f64,
    pub work_events: Vec<WorkEvent>,
    pub lifecycle_events: Vec<LifecycleEvent>,
    pub receipts: Vec<LedgerReceipt>,
    pub errors: Vec<String>,
    pub paused: bool,
}

impl StepReport {
    pub fn completed(&self) -> usize {
        self.work_events
            .iter()
            .filter(|e| matches!(e, WorkEvent::Completed { .. }))
            .count()
    }
}

/// Registry, queue, clock and RNG change together under one lock.
struct Floor {
    registry: AgentRegistry,
    queue: WorkQueue,
    clock_hours: f64,
    rng: StdRng,
}

/// Owns the whole simulation. Shared by reference between the driver loops and callers.
pub struct Workforce {
    config: SimulationConfig,
    floor: Mutex<Floor>,
    knowledge: KnowledgeStore,
    feed: ActivityFeed,
    paused: AtomicBool,
}

impl Workforce {
    pub fn new(config: SimulationConfig) -> Self {
        let registry = AgentRegistry::populate(&config);
        let feed = ActivityFeed::new(config.feed_capacity);
        feed.record(
            format!("Workforce assembled with {} agents", registry.len()),
            Component::Registry,
        );

        Self {
            floor: Mutex::new(Floor {
                registry,
                queue: WorkQueue::new(),
                clock_hours: 0.0,
                rng: StdRng::seed_from_u64(config.seed),
            }),
            knowledge: KnowledgeStore::new(),
            feed,
            paused: AtomicBool::new(false),
            config,
        }
    }

    pub fn from_snapshot(config: SimulationConfig, snapshot: Snapshot) -> Result<Self> {
        let workforce = Self::new(config);
        workforce.restore(snapshot)?;
        Ok(workforce)
    }

    fn floor(&self) -> MutexGuard<'_, Floor> {
        self.floor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn knowledge(&self) -> &KnowledgeStore {
        &self.knowledge
    }

    // Producer side

    pub fn submit(&self, draft: WorkItemDraft) -> Result<WorkItemId> {
        let mut floor = self.floor();
        let work_type = draft.work_type.clone();
        let id = floor.queue.enqueue(draft)?;
        self.feed
            .record(format!("Queued {} {}", work_type, id), Component::Scheduler);
        Ok(id)
    }

    /// Attaches the yield a claimed (or pending) item completes with.
    pub fn provide_output(&self, item: &WorkItemId, output: WorkYield) -> Result<()> {
        self.floor().queue.attach_output(item, output)
    }

    pub fn fail_work(&self, item: &WorkItemId, reason: &str) -> Result<WorkEvent> {
        let mut guard = self.floor();
        let floor = &mut *guard;
        let event = Scheduler::fail(&mut floor.registry, &mut floor.queue, item, reason)?;
        self.feed.record(event.describe(), Component::Scheduler);
        Ok(event)
    }

    // Loops

    /// Advances the simulated clock by `elapsed_hours`: due completions and timeouts, then
    /// the lifecycle tick, then an assignment pass. A no-op while paused.
    pub fn step(&self, elapsed_hours: f64) -> StepReport {
        let mut guard = self.floor();
        let floor = &mut *guard;

        if self.is_paused() {
            return StepReport {
                clock_hours: floor.clock_hours,
                paused: true,
                ..Default::default()
            };
        }

        let window_start = floor.clock_hours;
        let now = window_start + elapsed_hours.max(0.0);
        let mut report = StepReport::default();

        let (settled, errors) = Scheduler::settle_due(
            &mut floor.registry,
            &mut floor.queue,
            &self.knowledge,
            &self.config,
            window_start,
            now,
        );
        report.work_events.extend(settled);
        report.errors.extend(errors);

        self.tick_lifecycle(floor, now - window_start, &mut report);
        floor.clock_hours = now;

        let claims = Scheduler::assign(
            &mut floor.registry,
            &mut floor.queue,
            &self.config,
            now,
            &mut floor.rng,
        );
        report.work_events.extend(claims);

        let pruned = floor.queue.prune_terminal(self.config.retained_terminal_items);
        if pruned > 0 {
            log::debug!("Pruned {} finished work items", pruned);
        }

        self.record_report(&report);
        report.clock_hours = now;
        report
    }

    fn tick_lifecycle(&self, floor: &mut Floor, elapsed: f64, report: &mut StepReport) {
        let rates = WellbeingRates::from_config(&self.config);
        let exhaustion = ExhaustionLimits::from_config(&self.config);

        for id in floor.registry.ids() {
            let Ok(agent) = floor.registry.get_mut(&id) else {
                continue;
            };

            match PhaseMachine::tick(agent, elapsed, &rates, &exhaustion) {
                Some(Transition::StartBreak) => {
                    let hours_worked = agent.lifecycle.hours_in_phase;
                    let released = PhaseMachine::start_break(agent);
                    if let Some(item) = released {
                        match floor.queue.release(&item) {
                            Ok(_) => report.work_events.push(WorkEvent::Released {
                                item,
                                agent: id.clone(),
                            }),
                            Err(e) => {
                                log::error!("Releasing {} from {} failed: {}", item, id, e);
                                report.errors.push(format!("{}: {}", item, e));
                            }
                        }
                    }
                    report.lifecycle_events.push(LifecycleEvent::BreakStarted {
                        agent: id.clone(),
                        hours_worked,
                        released,
                    });
                }
                Some(Transition::EndBreak) => {
                    let shift = pick_return_shift(&mut floor.rng);
                    PhaseMachine::end_break(agent, shift, self.config.break_motivation_boost);
                    report.lifecycle_events.push(LifecycleEvent::BreakEnded {
                        agent: id.clone(),
                        shift,
                    });
                }
                None => {}
            }

            match purchases::maybe_treat(
                &mut floor.registry,
                &id,
                self.config.spend_threshold,
                self.config.spend_chance,
                &mut floor.rng,
            ) {
                Ok(Some(receipt)) => report.receipts.push(receipt),
                Ok(None) => {}
                Err(e) => report.errors.push(format!("{}: {}", id, e)),
            }
        }

        if let Some(transfer) =
            plan_rotation(&floor.registry, self.config.rotation_chance, &mut floor.rng)
        {
            if let Ok(agent) = floor.registry.get_mut(&transfer.agent) {
                agent.shift = transfer.to;
                report.lifecycle_events.push(LifecycleEvent::ShiftTransferred {
                    agent: transfer.agent,
                    from: transfer.from,
                    to: transfer.to,
                });
                log::debug!("Shifts now {}", shift_summary(&floor.registry.shift_counts()));
            }
        }
    }

    fn record_report(&self, report: &StepReport) {
        for event in &report.work_events {
            self.feed.record(event.describe(), Component::Scheduler);
        }
        for event in &report.lifecycle_events {
            self.feed.record(event.describe(), Component::Lifecycle);
        }
        for receipt in &report.receipts {
            self.feed.record(receipt.describe(), Component::Economy);
        }
    }

    /// Assignment pass without advancing the clock.
    pub fn assign(&self) -> Vec<WorkEvent> {
        if self.is_paused() {
            return Vec::new();
        }
        let mut guard = self.floor();
        let floor = &mut *guard;
        let now = floor.clock_hours;
        let events = Scheduler::assign(
            &mut floor.registry,
            &mut floor.queue,
            &self.config,
            now,
            &mut floor.rng,
        );
        for event in &events {
            self.feed.record(event.describe(), Component::Scheduler);
        }
        events
    }

    pub fn propagate(&self) -> Vec<PropagationOutcome> {
        if self.is_paused() {
            return Vec::new();
        }
        let mut guard = self.floor();
        let floor = &mut *guard;
        let outcomes = propagate(
            &floor.registry,
            &self.knowledge,
            self.config.shares_per_pass,
            &mut floor.rng,
        );
        for outcome in &outcomes {
            if outcome.changed() {
                self.feed.record(outcome.describe(), Component::Knowledge);
            } else {
                log::debug!("{}", outcome.describe());
            }
        }
        outcomes
    }

    // Persistence

    pub fn snapshot(&self) -> Snapshot {
        let floor = self.floor();
        Snapshot {
            version: SNAPSHOT_VERSION,
            taken_at: chrono::Utc::now(),
            clock_hours: floor.clock_hours,
            agents: floor.registry.to_vec(),
            work_queue: floor.queue.to_vec(),
            knowledge: self.knowledge.to_vec(),
            local_caches: self.knowledge.caches_snapshot(),
            ledger_totals: EconomyLedger::totals(floor.registry.iter()),
            activity_feed: self.feed.snapshot(),
        }
    }

    /// Validates and hydrates a snapshot. Nothing changes when validation fails.
    pub fn restore(&self, snapshot: Snapshot) -> Result<()> {
        snapshot.validate()?;

        let mut registry = AgentRegistry::from_agents(snapshot.agents)?;
        let queue = WorkQueue::from_items(snapshot.work_queue)?;
        let topped_up = registry.top_up(&self.config);

        let recomputed = EconomyLedger::totals(registry.iter());
        if topped_up.is_empty() && recomputed != snapshot.ledger_totals {
            log::warn!(
                "Snapshot ledger totals {:?} differ from agent balances {:?}; using balances",
                snapshot.ledger_totals,
                recomputed
            );
        }

        let mut floor = self.floor();
        floor.registry = registry;
        floor.queue = queue;
        floor.clock_hours = snapshot.clock_hours;

        self.knowledge
            .replace(snapshot.knowledge, snapshot.local_caches);
        self.feed.restore(snapshot.activity_feed);
        self.feed.record(
            format!(
                "Restored snapshot from {} at hour {:.1} ({} agents, {} new)",
                snapshot.taken_at.to_rfc3339(),
                snapshot.clock_hours,
                floor.registry.len(),
                topped_up.len()
            ),
            Component::Persistence,
        );
        Ok(())
    }

    // Economy

    pub fn earn(&self, agent: &str, amount: u64, reason: &str) -> Result<LedgerReceipt> {
        let receipt = EconomyLedger::earn(&mut self.floor().registry, agent, amount, reason)?;
        self.feed.record(receipt.describe(), Component::Economy);
        Ok(receipt)
    }

    pub fn spend(&self, agent: &str, amount: u64, reason: &str) -> Result<LedgerReceipt> {
        let receipt = EconomyLedger::spend(&mut self.floor().registry, agent, amount, reason)?;
        self.feed.record(receipt.describe(), Component::Economy);
        Ok(receipt)
    }

    pub fn purchase(&self, agent: &str, item: &str) -> Result<LedgerReceipt> {
        let receipt = purchases::buy(&mut self.floor().registry, agent, item)?;
        self.feed.record(receipt.describe(), Component::Economy);
        Ok(receipt)
    }

    pub fn ledger_totals(&self) -> LedgerTotals {
        EconomyLedger::totals(self.floor().registry.iter())
    }

    // Knowledge

    pub fn write_knowledge(
        &self,
        key: KnowledgeKey,
        value: Value,
        source: &str,
        overwrite: bool,
    ) -> Result<WriteOutcome> {
        let outcome = self.knowledge.write(key.clone(), value, source, overwrite)?;
        let verb = match outcome {
            WriteOutcome::Inserted => "added",
            WriteOutcome::Overwritten { .. } => "updated",
        };
        self.feed
            .record(format!("{} {} {}", source, verb, key), Component::Knowledge);
        Ok(outcome)
    }

    pub fn read_knowledge(&self, key: &KnowledgeKey) -> Option<Value> {
        self.knowledge.read(key)
    }

    pub fn query(&self, text: &str) -> QueryResult {
        self.knowledge.query(text, self.config.min_query_score)
    }

    /// Same matcher as [`Workforce::query`], over one agent's local cache.
    pub fn recall(&self, agent: &str, text: &str) -> Result<QueryResult> {
        self.floor().registry.get(agent)?;
        Ok(self
            .knowledge
            .recall_query(agent, text, self.config.min_query_score))
    }

    // Control

    pub fn pause(&self) {
        if !self.paused.swap(true, Ordering::SeqCst) {
            self.feed.record("Simulation paused", Component::Control);
        }
    }

    pub fn resume(&self) {
        if self.paused.swap(false, Ordering::SeqCst) {
            self.feed.record("Simulation resumed", Component::Control);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Fresh agents and an empty queue and feed. The clock keeps running; knowledge is
    /// kept only when configured to be.
    pub fn reset(&self) {
        let mut floor = self.floor();
        floor.registry = AgentRegistry::populate(&self.config);
        floor.queue.clear();

        if !self.config.retain_knowledge_on_reset {
            self.knowledge.clear();
        }
        self.feed.clear();
        log::info!(
            "Workforce reset at hour {:.1}: {} agents, knowledge {}",
            floor.clock_hours,
            floor.registry.len(),
            if self.config.retain_knowledge_on_reset {
                "retained"
            } else {
                "cleared"
            }
        );
    }

    // Views

    pub fn agent(&self, id: &str) -> Result<Agent> {
        self.floor().registry.get(id).cloned()
    }

    pub fn agents(&self) -> Vec<Agent> {
        self.floor().registry.to_vec()
    }

    pub fn work_item(&self, id: &WorkItemId) -> Result<WorkItem> {
        self.floor().queue.get(id).cloned()
    }

    pub fn work_items(&self) -> Vec<WorkItem> {
        self.floor().queue.to_vec()
    }

    pub fn activity(&self) -> Vec<ActivityEvent> {
        self.feed.snapshot()
    }

    pub fn progress(&self) -> Progress {
        let floor = self.floor();
        Progress::compute(
            floor.clock_hours,
            &floor.registry,
            &floor.queue,
            self.knowledge.len(),
        )
    }

    pub fn clock_hours(&self) -> f64 {
        self.floor().clock_hours
    }
}
