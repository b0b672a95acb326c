use anyhow::Result;
use async_trait::async_trait;

use super::snapshot::Snapshot;

/// Load/save boundary for workforce snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;

    /// `None` when nothing has been saved yet.
    async fn load(&self) -> Result<Option<Snapshot>>;

    fn describe(&self) -> String;
}
