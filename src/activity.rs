use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{PoisonError, RwLock};

use crate::storage::queue::WorkQueue;
use crate::storage::registry::AgentRegistry;
use crate::types::{ActivityEvent, Component, Shift, WorkStatus};

/// Bounded, append-only log of human-readable events. Oldest entries are evicted first.
#[derive(Debug)]
pub struct ActivityFeed {
    events: RwLock<VecDeque<ActivityEvent>>,
    capacity: usize,
}

impl ActivityFeed {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&self, message: impl Into<String>, source: Component) {
        let event = ActivityEvent::new(message, source);
        log::info!(target: "workforce::activity", "[{}] {}", source.as_str(), event.message);
        self.push(event);
    }

    fn push(&self, event: ActivityEvent) {
        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
        events.push_back(event);
        while events.len() > self.capacity {
            events.pop_front();
        }
    }

    /// Copy of the current events, oldest first.
    pub fn snapshot(&self) -> Vec<ActivityEvent> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Replaces the feed, keeping the newest events that fit.
    pub fn restore(&self, events: Vec<ActivityEvent>) {
        self.clear();
        for event in events {
            self.push(event);
        }
    }
}

/// Progress figures derived from current state on every call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub clock_hours: f64,
    pub agents: usize,
    pub agents_on_break: usize,
    pub agents_busy: usize,
    pub shifts: BTreeMap<Shift, usize>,
    pub items_pending: usize,
    pub items_claimed: usize,
    pub items_completed: usize,
    pub items_failed: usize,
    pub tasks_completed: u64,
    pub knowledge_entries: usize,
}

impl Progress {
    pub fn compute(
        clock_hours: f64,
        registry: &AgentRegistry,
        queue: &WorkQueue,
        knowledge_entries: usize,
    ) -> Self {
        Self {
            clock_hours,
            agents: registry.len(),
            agents_on_break: registry.iter().filter(|a| a.is_on_break()).count(),
            agents_busy: registry
                .iter()
                .filter(|a| a.current_work_item.is_some())
                .count(),
            shifts: registry.shift_counts(),
            items_pending: queue.count(WorkStatus::Pending),
            items_claimed: queue.count(WorkStatus::Claimed),
            items_completed: queue.count(WorkStatus::Completed),
            items_failed: queue.count(WorkStatus::Failed),
            tasks_completed: registry.iter().map(|a| a.tasks_completed).sum(),
            knowledge_entries,
        }
    }
}
