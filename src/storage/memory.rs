//! In-memory storage backend (for testing).

use std::collections::BTreeMap;

use tracing::debug;

use crate::errors::Result;
use crate::record::MemberRecord;
use crate::storage::GenerationStore;

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    collections: BTreeMap<u32, Vec<MemberRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total records across all generations.
    pub fn count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }
}

impl GenerationStore for MemoryStore {
    fn append(&mut self, generation: u32, record: &MemberRecord) -> Result<String> {
        let collection = self.collections.entry(generation).or_default();
        collection.push(record.clone());
        debug!(generation, uid = %record.uid, count = collection.len(), "member appended");
        Ok(format!("memory:G{generation}"))
    }

    fn load(&self, generation: u32) -> Result<Vec<MemberRecord>> {
        Ok(self
            .collections
            .get(&generation)
            .cloned()
            .unwrap_or_default())
    }

    fn generations(&self) -> Result<Vec<u32>> {
        Ok(self.collections.keys().copied().collect())
    }
}
