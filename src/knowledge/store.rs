use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::query::{best_match, QueryResult};
use crate::error::{Result, WorkforceError};
use crate::types::{AgentId, KnowledgeEntry, KnowledgeKey};

pub type LocalCache = BTreeMap<KnowledgeKey, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Inserted,
    Overwritten { previous: Value },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    Copied,
    AlreadyKnown,
    /// Student holds a different value and no confirmation was given.
    Conflict,
    /// Student's differing value was replaced on confirmation.
    Corrected,
}

/// Shared keyed facts plus per-agent recall caches. Safe for concurrent callers.
#[derive(Debug, Default)]
pub struct KnowledgeStore {
    entries: RwLock<BTreeMap<KnowledgeKey, KnowledgeEntry>>,
    caches: RwLock<HashMap<AgentId, LocalCache>>,
}

impl KnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> RwLockReadGuard<'_, BTreeMap<KnowledgeKey, KnowledgeEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn entries_mut(&self) -> RwLockWriteGuard<'_, BTreeMap<KnowledgeKey, KnowledgeEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn caches(&self) -> RwLockReadGuard<'_, HashMap<AgentId, LocalCache>> {
        self.caches.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn caches_mut(&self) -> RwLockWriteGuard<'_, HashMap<AgentId, LocalCache>> {
        self.caches.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts a fact. An existing key is only replaced when `overwrite` is set; the
    /// first contributor is kept either way.
    pub fn write(
        &self,
        key: KnowledgeKey,
        value: Value,
        source: &str,
        overwrite: bool,
    ) -> Result<WriteOutcome> {
        let mut entries = self.entries_mut();
        match entries.get_mut(&key) {
            Some(_) if !overwrite => Err(WorkforceError::KeyConflict(key)),
            Some(entry) => {
                let previous = std::mem::replace(&mut entry.value, value);
                entry.updated_by = Some(source.to_string());
                entry.updated_at = Some(Utc::now());
                Ok(WriteOutcome::Overwritten { previous })
            }
            None => {
                entries.insert(
                    key.clone(),
                    KnowledgeEntry {
                        key,
                        value,
                        contributed_by: source.to_string(),
                        contributed_at: Utc::now(),
                        updated_by: None,
                        updated_at: None,
                    },
                );
                Ok(WriteOutcome::Inserted)
            }
        }
    }

    pub fn read(&self, key: &KnowledgeKey) -> Option<Value> {
        self.entries().get(key).map(|entry| entry.value.clone())
    }

    pub fn entry(&self, key: &KnowledgeKey) -> Option<KnowledgeEntry> {
        self.entries().get(key).cloned()
    }

    pub fn query(&self, text: &str, min_score: f64) -> QueryResult {
        let entries = self.entries();
        best_match(
            text,
            entries.iter().map(|(key, entry)| (key, &entry.value)),
            min_score,
        )
    }

    /// Stores a value in one agent's recall cache.
    pub fn learn(&self, agent: &str, key: KnowledgeKey, value: Value) {
        self.caches_mut()
            .entry(agent.to_string())
            .or_default()
            .insert(key, value);
    }

    pub fn recall(&self, agent: &str, key: &KnowledgeKey) -> Option<Value> {
        self.caches()
            .get(agent)
            .and_then(|cache| cache.get(key))
            .cloned()
    }

    pub fn recall_query(&self, agent: &str, text: &str, min_score: f64) -> QueryResult {
        let caches = self.caches();
        match caches.get(agent) {
            Some(cache) => best_match(text, cache, min_score),
            None => QueryResult::NotFound {
                query: text.to_string(),
            },
        }
    }

    pub fn cached_keys(&self, agent: &str) -> Vec<KnowledgeKey> {
        self.caches()
            .get(agent)
            .map(|cache| cache.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Copies one cached fact from teacher to student. The teacher keeps its copy; a
    /// student holding a different value is only corrected when `confirmed`.
    pub fn share(
        &self,
        teacher: &str,
        student: &str,
        key: &KnowledgeKey,
        confirmed: bool,
    ) -> Option<ShareOutcome> {
        let mut caches = self.caches_mut();
        let value = caches.get(teacher)?.get(key)?.clone();
        let student_cache = caches.entry(student.to_string()).or_default();

        let outcome = match student_cache.get(key) {
            None => ShareOutcome::Copied,
            Some(existing) if *existing == value => return Some(ShareOutcome::AlreadyKnown),
            Some(_) if confirmed => ShareOutcome::Corrected,
            Some(_) => return Some(ShareOutcome::Conflict),
        };
        student_cache.insert(key.clone(), value);
        Some(outcome)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn to_vec(&self) -> Vec<KnowledgeEntry> {
        self.entries().values().cloned().collect()
    }

    pub fn caches_snapshot(&self) -> BTreeMap<AgentId, LocalCache> {
        self.caches()
            .iter()
            .map(|(agent, cache)| (agent.clone(), cache.clone()))
            .collect()
    }

    pub fn replace(&self, entries: Vec<KnowledgeEntry>, caches: BTreeMap<AgentId, LocalCache>) {
        let mut current = self.entries_mut();
        *current = entries
            .into_iter()
            .map(|entry| (entry.key.clone(), entry))
            .collect();
        drop(current);

        *self.caches_mut() = caches.into_iter().collect();
    }

    pub fn clear(&self) {
        self.entries_mut().clear();
        self.caches_mut().clear();
    }
}
