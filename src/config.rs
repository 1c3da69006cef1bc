//! Ledger configuration.
//!
//! Resolution order: defaults, then a TOML file, then `FAMILY_LEDGER_*`
//! environment variables, then command-line flags (applied by the binary).
//!
//! ```toml
//! data_dir = "./family_data"
//! on_corrupt = "recover"   # or "fail"
//! atomic_writes = true
//! ```

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};
use crate::storage::CorruptPolicy;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "family_ledger.toml";

pub const DEFAULT_DATA_DIR: &str = "./family_data";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Directory holding one `G{n}.yaml` per generation.
    pub data_dir: PathBuf,
    pub on_corrupt: CorruptPolicy,
    /// Write through a temp file and rename instead of overwriting in place.
    /// When off, an interrupt during a save can truncate the collection.
    pub atomic_writes: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            on_corrupt: CorruptPolicy::Recover,
            atomic_writes: true,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&contents).map_err(|e| {
            LedgerError::Config(format!("failed to parse TOML in '{}': {}", path.display(), e))
        })
    }

    /// Create configuration from a TOML string.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        toml::from_str(toml)
            .map_err(|e| LedgerError::Config(format!("failed to parse TOML: {e}")))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| LedgerError::Config(format!("failed to serialize to TOML: {e}")))
    }

    /// Load from `path` if given, else from [`DEFAULT_CONFIG_FILE`] when it
    /// exists, else defaults; environment overrides are applied last.
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };
        config.with_env_overrides()
    }

    /// Apply environment variable overrides.
    ///
    /// | Variable | Field | Type |
    /// |----------|-------|------|
    /// | `FAMILY_LEDGER_DATA_DIR` | `data_dir` | path |
    /// | `FAMILY_LEDGER_ON_CORRUPT` | `on_corrupt` | `recover` / `fail` |
    /// | `FAMILY_LEDGER_ATOMIC_WRITES` | `atomic_writes` | bool |
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(val) = lookup("FAMILY_LEDGER_DATA_DIR") {
            self.data_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("FAMILY_LEDGER_ON_CORRUPT") {
            self.on_corrupt = val
                .parse()
                .map_err(|e| LedgerError::Config(format!("FAMILY_LEDGER_ON_CORRUPT: {e}")))?;
        }
        if let Some(val) = lookup("FAMILY_LEDGER_ATOMIC_WRITES") {
            self.atomic_writes = val.trim().parse().map_err(|_| {
                LedgerError::Config(format!("FAMILY_LEDGER_ATOMIC_WRITES: not a bool: {val}"))
            })?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(LedgerError::Config("data_dir must not be empty".into()));
        }
        Ok(())
    }
}
