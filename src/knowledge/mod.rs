pub mod query;
pub mod store;

pub use query::{KnowledgeMatch, MatchKind, QueryResult};
pub use store::{KnowledgeStore, LocalCache, ShareOutcome, WriteOutcome};
