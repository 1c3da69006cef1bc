//! Storage backends: YAML file per generation, in-memory.

pub mod memory;
pub mod scalar;
pub mod yaml;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::record::MemberRecord;

pub use memory::MemoryStore;
pub use yaml::YamlStore;

/// What to do when an existing collection cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptPolicy {
    /// Treat the collection as empty; the next append replaces it.
    #[default]
    Recover,
    /// Surface the parse failure and leave the collection untouched.
    Fail,
}

impl std::str::FromStr for CorruptPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recover" => Ok(Self::Recover),
            "fail" => Ok(Self::Fail),
            other => Err(format!("unknown corrupt policy: {other}")),
        }
    }
}

/// Abstract backend for member persistence.
pub trait GenerationStore {
    /// Append a record to the end of its generation's collection.
    /// Returns a printable location of the collection.
    fn append(&mut self, generation: u32, record: &MemberRecord) -> Result<String>;

    /// Load the records of one generation, in stored order.
    fn load(&self, generation: u32) -> Result<Vec<MemberRecord>>;

    /// Generations that currently have a collection, ascending.
    fn generations(&self) -> Result<Vec<u32>>;
}
