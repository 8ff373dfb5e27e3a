//! Cache key generation.

use super::canonical::encode_request;
use crate::types::{AgentId, Context, Payload};
use sha2::{Digest, Sha256};
use std::fmt;

/// Fixed-length SHA-256 fingerprint of a normalized agent request.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self { Self(bytes) }
    pub fn as_bytes(&self) -> &[u8; 32] { &self.0 }
    pub fn to_hex(&self) -> String { self.0.iter().map(|b| format!("{:02x}", b)).collect() }

    /// First 16 hex characters, enough to correlate log lines.
    pub fn short(&self) -> String { self.to_hex()[..16].to_string() }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.to_hex()) }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "CacheKey({})", self.short()) }
}

/// Produces [`CacheKey`]s from agent requests.
///
/// A normalizer is a pure function of its input: the same logical request
/// yields the same key in every process. An optional salt separates key
/// spaces, e.g. between deployments sharing one store.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    salt: Option<String>,
}

impl Normalizer {
    pub fn new() -> Self { Self { salt: None } }
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self { self.salt = Some(salt.into()); self }

    pub fn normalize(&self, agent: &AgentId, payload: &Payload, context: &Context) -> CacheKey {
        let mut hasher = Sha256::new();
        encode_request(&mut hasher, self.salt.as_deref(), agent, payload, context);
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        CacheKey(out)
    }

    /// The exact bytes that [`Normalizer::normalize`] hashes.
    pub fn canonical_bytes(&self, agent: &AgentId, payload: &Payload, context: &Context) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_request(&mut buf, self.salt.as_deref(), agent, payload, context);
        buf
    }
}
