use std::collections::{BTreeMap, HashMap};

use crate::error::{Result, WorkforceError};
use crate::storage::registry::is_known_specialty;
use crate::types::{AgentId, WorkItem, WorkItemDraft, WorkItemId, WorkStatus, WorkYield};

/// Pending and historical work items, ordered by enqueue sequence.
#[derive(Debug, Clone, Default)]
pub struct WorkQueue {
    items: BTreeMap<u64, WorkItem>,
    index: HashMap<WorkItemId, u64>,
    next_sequence: u64,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<WorkItem>) -> Result<Self> {
        let mut queue = Self::new();
        for item in items {
            if queue.index.contains_key(&item.id) {
                return Err(WorkforceError::InvalidSnapshot(format!(
                    "duplicate work item {}",
                    item.id
                )));
            }
            if queue.items.contains_key(&item.sequence) {
                return Err(WorkforceError::InvalidSnapshot(format!(
                    "duplicate queue sequence {}",
                    item.sequence
                )));
            }
            queue.next_sequence = queue.next_sequence.max(item.sequence + 1);
            queue.index.insert(item.id, item.sequence);
            queue.items.insert(item.sequence, item);
        }
        Ok(queue)
    }

    pub fn validate(draft: &WorkItemDraft) -> Result<()> {
        if draft.work_type.trim().is_empty() {
            return Err(WorkforceError::InvalidWorkItem(
                "missing work type".to_string(),
            ));
        }
        if let Some(tag) = draft.specialty.tag() {
            if !is_known_specialty(tag) {
                return Err(WorkforceError::InvalidWorkItem(format!(
                    "unknown specialty {:?}",
                    tag
                )));
            }
        }
        Ok(())
    }

    pub fn enqueue(&mut self, draft: WorkItemDraft) -> Result<WorkItemId> {
        Self::validate(&draft)?;

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let item = WorkItem::from_draft(draft, sequence);
        let id = item.id;
        self.index.insert(id, sequence);
        self.items.insert(sequence, item);
        Ok(id)
    }

    pub fn get(&self, id: &WorkItemId) -> Result<&WorkItem> {
        self.index
            .get(id)
            .and_then(|seq| self.items.get(seq))
            .ok_or(WorkforceError::UnknownWorkItem(*id))
    }

    fn get_mut(&mut self, id: &WorkItemId) -> Result<&mut WorkItem> {
        self.index
            .get(id)
            .and_then(|seq| self.items.get_mut(seq))
            .ok_or(WorkforceError::UnknownWorkItem(*id))
    }

    /// Pending items in enqueue order.
    pub fn pending(&self) -> impl Iterator<Item = &WorkItem> {
        self.items.values().filter(|item| item.is_pending())
    }

    pub fn claimed(&self) -> impl Iterator<Item = &WorkItem> {
        self.items.values().filter(|item| item.is_claimed())
    }

    pub fn peek_next_unclaimed(&self) -> Option<&WorkItem> {
        self.pending().next()
    }

    pub fn claim(
        &mut self,
        id: &WorkItemId,
        agent: &str,
        now_hour: f64,
        processing_hours: f64,
        deadline_hours: f64,
    ) -> Result<()> {
        let item = self.get_mut(id)?;
        match item.status {
            WorkStatus::Pending => {}
            WorkStatus::Claimed => {
                return Err(WorkforceError::DuplicateClaim {
                    item: *id,
                    holder: item.claimed_by.clone().unwrap_or_default(),
                });
            }
            status => {
                return Err(WorkforceError::InvalidStatus {
                    item: *id,
                    status,
                    action: "claimed",
                });
            }
        }

        item.status = WorkStatus::Claimed;
        item.claimed_by = Some(agent.to_string());
        item.claimed_at_hour = Some(now_hour);
        item.completes_at_hour = Some(now_hour + processing_hours);
        item.deadline_hour = Some(now_hour + deadline_hours.max(processing_hours));
        item.attempts += 1;
        Ok(())
    }

    /// Puts a claimed item back in line at its original position.
    pub fn release(&mut self, id: &WorkItemId) -> Result<Option<AgentId>> {
        let item = self.get_mut(id)?;
        if item.status != WorkStatus::Claimed {
            return Err(WorkforceError::InvalidStatus {
                item: *id,
                status: item.status,
                action: "released",
            });
        }

        item.status = WorkStatus::Pending;
        item.claimed_at_hour = None;
        item.completes_at_hour = None;
        item.deadline_hour = None;
        Ok(item.claimed_by.take())
    }

    pub fn complete(&mut self, id: &WorkItemId) -> Result<WorkItem> {
        let item = self.get_mut(id)?;
        if item.status != WorkStatus::Claimed {
            return Err(WorkforceError::InvalidStatus {
                item: *id,
                status: item.status,
                action: "completed",
            });
        }
        item.status = WorkStatus::Completed;
        Ok(item.clone())
    }

    /// Terminal failure; the item is never re-enqueued.
    pub fn fail(&mut self, id: &WorkItemId, reason: &str) -> Result<WorkItem> {
        let item = self.get_mut(id)?;
        if item.status.is_terminal() {
            return Err(WorkforceError::InvalidStatus {
                item: *id,
                status: item.status,
                action: "failed",
            });
        }
        item.status = WorkStatus::Failed;
        item.failure_reason = Some(reason.to_string());
        Ok(item.clone())
    }

    pub fn attach_output(&mut self, id: &WorkItemId, output: WorkYield) -> Result<()> {
        let item = self.get_mut(id)?;
        if item.status.is_terminal() {
            return Err(WorkforceError::InvalidStatus {
                item: *id,
                status: item.status,
                action: "given an output",
            });
        }
        item.output = Some(output);
        Ok(())
    }

    /// Drops the oldest terminal items beyond `keep`.
    pub fn prune_terminal(&mut self, keep: usize) -> usize {
        let terminal: Vec<u64> = self
            .items
            .iter()
            .filter(|(_, item)| item.status.is_terminal())
            .map(|(seq, _)| *seq)
            .collect();

        let excess = terminal.len().saturating_sub(keep);
        for seq in terminal.into_iter().take(excess) {
            if let Some(item) = self.items.remove(&seq) {
                self.index.remove(&item.id);
            }
        }
        excess
    }

    pub fn count(&self, status: WorkStatus) -> usize {
        self.items.values().filter(|i| i.status == status).count()
    }

    pub fn to_vec(&self) -> Vec<WorkItem> {
        self.items.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
    }
}
