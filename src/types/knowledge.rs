use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::AgentId;
use crate::error::WorkforceError;

/// Composite key of subject and attribute, written `subject.attribute`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KnowledgeKey {
    subject: String,
    attribute: String,
}

impl KnowledgeKey {
    pub fn new(
        subject: impl AsRef<str>,
        attribute: impl AsRef<str>,
    ) -> Result<Self, WorkforceError> {
        let subject = subject.as_ref().trim().to_lowercase();
        let attribute = attribute.as_ref().trim().to_lowercase();
        if subject.is_empty() || attribute.is_empty() {
            return Err(WorkforceError::InvalidKnowledgeKey(format!(
                "{}.{}",
                subject, attribute
            )));
        }
        Ok(Self { subject, attribute })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

impl fmt::Display for KnowledgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.subject, self.attribute)
    }
}

impl FromStr for KnowledgeKey {
    type Err = WorkforceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (subject, attribute) = s
            .rsplit_once('.')
            .ok_or_else(|| WorkforceError::InvalidKnowledgeKey(s.to_string()))?;
        Self::new(subject, attribute)
    }
}

impl TryFrom<String> for KnowledgeKey {
    type Error = WorkforceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KnowledgeKey> for String {
    fn from(key: KnowledgeKey) -> Self {
        key.to_string()
    }
}

/// A fact carried by a work item's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeFact {
    pub key: KnowledgeKey,
    pub value: Value,
}

impl KnowledgeFact {
    pub fn new(key: KnowledgeKey, value: impl Into<Value>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub key: KnowledgeKey,
    pub value: Value,
    pub contributed_by: AgentId,
    pub contributed_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_by: Option<AgentId>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
