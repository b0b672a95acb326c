use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};

use super::snapshot::Snapshot;
use super::traits::SnapshotStore;

#[derive(Clone, Default)]
pub struct InMemorySnapshotStore {
    latest: Arc<RwLock<Option<Snapshot>>>,
    saves: Arc<RwLock<usize>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        *self.saves.write().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }

    async fn load(&self) -> Result<Option<Snapshot>> {
        Ok(self
            .latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}
