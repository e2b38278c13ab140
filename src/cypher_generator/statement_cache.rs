use std::collections::{HashMap, VecDeque};

use sha2::{Digest, Sha256};

use crate::cypher_ir::ReadOnlyQuery;

use super::errors::CypherGeneratorError;
use super::to_cypher::GeneratedStatement;

const DEFAULT_CAPACITY: usize = 1024;

/// Bounded cache of generated statements keyed by a content fingerprint
/// of the finished query.
///
/// Generation is deterministic, so a fingerprint hit can serve the cached
/// text directly; only the parameter values differ between executions and
/// those are re-bound by the caller. Eviction is FIFO on insertion order.
pub struct StatementCache {
    entries: HashMap<String, GeneratedStatement>,
    insertion_order: VecDeque<String>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl StatementCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        StatementCache {
            entries: HashMap::new(),
            insertion_order: VecDeque::new(),
            capacity: capacity.max(1),
            hits: 0,
            misses: 0,
        }
    }

    /// Content fingerprint of a finished query. Serialization order is
    /// stable for unmodified queries, so equal queries hash equal.
    pub fn fingerprint(query: &ReadOnlyQuery) -> Result<String, CypherGeneratorError> {
        let bytes = serde_json::to_vec(query)
            .map_err(|e| CypherGeneratorError::Fingerprint(e.to_string()))?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(hex::encode(hasher.finalize()))
    }

    pub fn get(&mut self, fingerprint: &str) -> Option<GeneratedStatement> {
        match self.entries.get(fingerprint) {
            Some(statement) => {
                self.hits += 1;
                log::debug!(
                    "statement cache hit for {}",
                    fingerprint.get(..12).unwrap_or(fingerprint)
                );
                Some(statement.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, fingerprint: String, statement: GeneratedStatement) {
        if self.entries.contains_key(&fingerprint) {
            return;
        }
        while self.entries.len() >= self.capacity {
            match self.insertion_order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.insertion_order.push_back(fingerprint.clone());
        self.entries.insert(fingerprint, statement);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

impl Default for StatementCache {
    fn default() -> Self {
        Self::new()
    }
}
