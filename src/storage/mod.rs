pub mod json_file;
pub mod memory;
pub mod queue;
pub mod registry;
pub mod snapshot;
pub mod traits;

pub use json_file::JsonFileSnapshotStore;
pub use memory::InMemorySnapshotStore;
pub use queue::WorkQueue;
pub use registry::AgentRegistry;
pub use snapshot::{Snapshot, SNAPSHOT_VERSION};
pub use traits::SnapshotStore;
