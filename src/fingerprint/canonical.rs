//! Canonical byte encoding of agent requests.
//!
//! Every variable-length field is length-prefixed and every value is tagged,
//! so distinct logical inputs never share an encoding.

use crate::types::{AgentId, Context, Payload};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Format tag mixed into every fingerprint. Bump when the encoding changes.
pub(crate) const FORMAT_TAG: &[u8] = b"agent-prefetch/fingerprint/v1";

const TAG_NULL: u8 = b'n';
const TAG_BOOL: u8 = b'b';
const TAG_NUMBER: u8 = b'd';
const TAG_STRING: u8 = b's';
const TAG_ARRAY: u8 = b'a';
const TAG_OBJECT: u8 = b'o';
const TAG_CONTEXT: u8 = b'c';
const TAG_SALT: u8 = b'S';

/// Destination of canonical bytes: a buffer for inspection or a hasher.
pub(crate) trait CanonicalSink {
    fn put(&mut self, bytes: &[u8]);
}

impl CanonicalSink for Vec<u8> {
    fn put(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

impl CanonicalSink for Sha256 {
    fn put(&mut self, bytes: &[u8]) {
        Digest::update(self, bytes);
    }
}

pub(crate) fn encode_request<S: CanonicalSink>(
    sink: &mut S,
    salt: Option<&str>,
    agent: &AgentId,
    payload: &Payload,
    context: &Context,
) {
    put_bytes(sink, FORMAT_TAG);
    if let Some(salt) = salt {
        sink.put(&[TAG_SALT]);
        put_bytes(sink, salt.as_bytes());
    }
    put_bytes(sink, agent.as_str().as_bytes());

    sink.put(&[TAG_OBJECT]);
    put_len(sink, payload.len());
    let mut entries: Vec<_> = payload.iter().collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
    for (key, value) in entries {
        put_bytes(sink, key.as_bytes());
        encode_value(sink, value);
    }

    sink.put(&[TAG_CONTEXT]);
    put_len(sink, context.turns().len());
    for turn in context.turns() {
        put_bytes(sink, turn.agent_id.as_str().as_bytes());
        put_bytes(sink, turn.content.trim().as_bytes());
    }
}

fn encode_value<S: CanonicalSink>(sink: &mut S, value: &Value) {
    match value {
        Value::Null => sink.put(&[TAG_NULL]),
        Value::Bool(b) => sink.put(&[TAG_BOOL, u8::from(*b)]),
        Value::Number(n) => {
            sink.put(&[TAG_NUMBER]);
            put_bytes(sink, n.to_string().as_bytes());
        }
        Value::String(s) => {
            sink.put(&[TAG_STRING]);
            put_bytes(sink, s.trim().as_bytes());
        }
        Value::Array(items) => {
            sink.put(&[TAG_ARRAY]);
            put_len(sink, items.len());
            for item in items {
                encode_value(sink, item);
            }
        }
        Value::Object(map) => encode_object(sink, map),
    }
}

fn encode_object<S: CanonicalSink>(sink: &mut S, map: &Map<String, Value>) {
    sink.put(&[TAG_OBJECT]);
    put_len(sink, map.len());
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
    for (key, value) in entries {
        put_bytes(sink, key.as_bytes());
        encode_value(sink, value);
    }
}

fn put_len<S: CanonicalSink>(sink: &mut S, len: usize) {
    sink.put(&(len as u64).to_le_bytes());
}

fn put_bytes<S: CanonicalSink>(sink: &mut S, bytes: &[u8]) {
    put_len(sink, bytes.len());
    sink.put(bytes);
}
