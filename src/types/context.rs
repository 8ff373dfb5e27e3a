//! Request payloads and conversation context.

use super::agent::AgentId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key under which the pipeline places each hop's textual input.
pub const INPUT_TEXT_KEY: &str = "input_text";

/// Key/value request body handed to an agent.
///
/// Key order carries no meaning; the fingerprint normalizer sorts keys before
/// hashing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The textual input of this hop, if any.
    pub fn input_text(&self) -> Option<&str> {
        self.0.get(INPUT_TEXT_KEY).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for Payload {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One prior agent output carried in the conversation context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub agent_id: AgentId,
    pub content: String,
}

impl Turn {
    pub fn new(agent_id: impl Into<AgentId>, content: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            content: content.into(),
        }
    }
}

/// Conversation context for a hop: the chain's session id and the ordered
/// turns that preceded it.
///
/// The session id identifies one chain run and is deliberately left out of
/// the cache fingerprint; the turns are part of it, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub session_id: String,
    turns: Vec<Turn>,
}

impl Context {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            turns: Vec::new(),
        }
    }

    pub fn with_turns(mut self, turns: Vec<Turn>) -> Self {
        self.turns = turns;
        self
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Drops the oldest turns so that at most `max_turns` remain.
    pub fn truncate_front(&mut self, max_turns: usize) {
        if self.turns.len() > max_turns {
            let excess = self.turns.len() - max_turns;
            self.turns.drain(..excess);
        }
    }
}
