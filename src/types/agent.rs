//! Agent identity and agent output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an externally invoked agent.
///
/// Ordering is lexicographic on the underlying string, which the transition
/// model relies on for reproducible tie-breaking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for AgentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Output of a single agent invocation.
///
/// This is what the response cache stores and what the pipeline threads into
/// the next hop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub agent_id: AgentId,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl AgentResponse {
    pub fn new(agent_id: impl Into<AgentId>, output: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            output: output.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_ordering_is_lexicographic() {
        let mut ids = vec![AgentId::from("summarizer"), AgentId::from("classifier"), AgentId::from("retriever")];
        ids.sort();
        let names: Vec<_> = ids.iter().map(AgentId::as_str).collect();
        assert_eq!(names, vec!["classifier", "retriever", "summarizer"]);
    }

    #[test]
    fn test_agent_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&AgentId::from("retriever")).unwrap();
        assert_eq!(json, "\"retriever\"");
    }

    #[test]
    fn test_response_metadata_is_optional_on_the_wire() {
        let response = AgentResponse::new("classifier", "finance");
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("metadata").is_none());

        let parsed: AgentResponse =
            serde_json::from_str(r#"{"agent_id":"classifier","output":"finance"}"#).unwrap();
        assert_eq!(parsed, response);
    }
}
