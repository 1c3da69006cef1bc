//! Family Ledger: genealogical record entry.
//!
//! Members are entered one at a time, given a short generated identifier
//! (`G{generation}-XXXXXX`) and appended to a YAML collection holding every
//! member of the same generation.

pub mod config;
pub mod errors;
pub mod hash;
pub mod record;
pub mod session;
pub mod stats;
pub mod storage;
pub mod uid;

pub use config::LedgerConfig;
pub use errors::{LedgerError, Result};
pub use record::{FieldValue, Gender, MemberDraft, MemberRecord};
pub use session::{EntrySession, SessionContext, SessionSummary};
pub use stats::LedgerStats;
pub use storage::{CorruptPolicy, GenerationStore, MemoryStore, YamlStore};
