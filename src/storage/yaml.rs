//! YAML file storage, one collection per generation.
//!
//! Layout:
//! ```text
//! {base_dir}/G{generation}.yaml   block-style sequence of member mappings
//! ```
//!
//! Every append is a full read-modify-write of one file. Prior entries are
//! carried as raw YAML values so keys this crate does not model survive the
//! rewrite unchanged.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;
use crate::errors::{LedgerError, Result};
use crate::record::MemberRecord;
use crate::storage::{scalar, CorruptPolicy, GenerationStore};

const FILE_PREFIX: &str = "G";
const FILE_EXTENSION: &str = "yaml";

/// File name of the collection for `generation`.
pub fn collection_file_name(generation: u32) -> String {
    format!("{FILE_PREFIX}{generation}.{FILE_EXTENSION}")
}

/// Inverse of [`collection_file_name`].
pub fn parse_collection_file_name(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_EXTENSION)?
        .strip_suffix('.')?
        .parse()
        .ok()
}

/// YAML file-per-generation storage backend.
#[derive(Debug, Clone)]
pub struct YamlStore {
    base_dir: PathBuf,
    on_corrupt: CorruptPolicy,
    atomic_writes: bool,
}

impl YamlStore {
    /// Open a store rooted at `base_dir`. The directory is created on the
    /// first append, not here.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            on_corrupt: CorruptPolicy::default(),
            atomic_writes: true,
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(&config.data_dir)
            .with_corrupt_policy(config.on_corrupt)
            .with_atomic_writes(config.atomic_writes)
    }

    #[must_use]
    pub fn with_corrupt_policy(mut self, policy: CorruptPolicy) -> Self {
        self.on_corrupt = policy;
        self
    }

    #[must_use]
    pub fn with_atomic_writes(mut self, atomic: bool) -> Self {
        self.atomic_writes = atomic;
        self
    }

    /// Whether appends go through a temp file and rename. Without it an
    /// interrupted append can leave the collection truncated.
    pub fn atomic_writes(&self) -> bool {
        self.atomic_writes
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn collection_path(&self, generation: u32) -> PathBuf {
        self.base_dir.join(collection_file_name(generation))
    }

    /// Read a collection as raw entries. Missing, blank or (under the
    /// recover policy) unparsable content reads as empty.
    pub fn read_entries(&self, generation: u32) -> Result<Vec<Value>> {
        self.read_collection(&self.collection_path(generation))
    }

    fn read_collection(&self, path: &Path) -> Result<Vec<Value>> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return self.unparsable(path, e.to_string());
            }
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_yaml::from_str::<Value>(&text) {
            Ok(Value::Sequence(entries)) => Ok(entries),
            Ok(Value::Null) => Ok(Vec::new()),
            Ok(_) => self.unparsable(path, "top level is not a sequence".to_string()),
            Err(e) => self.unparsable(path, e.to_string()),
        }
    }

    fn unparsable(&self, path: &Path, reason: String) -> Result<Vec<Value>> {
        match self.on_corrupt {
            CorruptPolicy::Recover => {
                warn!(path = %path.display(), %reason, "unparsable collection, starting empty");
                Ok(Vec::new())
            }
            CorruptPolicy::Fail => Err(LedgerError::CorruptCollection {
                path: path.to_path_buf(),
                reason,
            }),
        }
    }

    fn write_collection(&self, path: &Path, entries: &[Value]) -> Result<()> {
        let yaml = scalar::render(entries)?;
        if !self.atomic_writes {
            fs::write(path, yaml)?;
            return Ok(());
        }
        // Temp file must share the target's filesystem for the rename.
        let dir = path.parent().unwrap_or(self.base_dir.as_path());
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(yaml.as_bytes())?;
        // The rename replaces the inode, so carry the collection's mode over.
        if let Ok(meta) = fs::metadata(path) {
            tmp.as_file().set_permissions(meta.permissions())?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path)?;
        debug!(path = %path.display(), bytes = yaml.len(), "collection persisted");
        Ok(())
    }
}

impl GenerationStore for YamlStore {
    fn append(&mut self, generation: u32, record: &MemberRecord) -> Result<String> {
        fs::create_dir_all(&self.base_dir)?;
        let path = self.collection_path(generation);

        let mut entries = self.read_collection(&path)?;
        entries.push(serde_yaml::to_value(record)?);
        self.write_collection(&path, &entries)?;

        info!(
            generation,
            uid = %record.uid,
            count = entries.len(),
            path = %path.display(),
            "member appended"
        );
        Ok(path.display().to_string())
    }

    fn load(&self, generation: u32) -> Result<Vec<MemberRecord>> {
        let path = self.collection_path(generation);
        let entries = self.read_collection(&path)?;
        let mut records = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_yaml::from_value::<MemberRecord>(entry) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(path = %path.display(), index, error = %e, "skipping malformed member");
                }
            }
        }
        Ok(records)
    }

    fn generations(&self) -> Result<Vec<u32>> {
        let dir = match fs::read_dir(&self.base_dir) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut generations = Vec::new();
        for entry in dir {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(generation) = entry
                .file_name()
                .to_str()
                .and_then(parse_collection_file_name)
            {
                generations.push(generation);
            }
        }
        generations.sort_unstable();
        Ok(generations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldValue, Gender};

    fn make_record(uid: &str, generation: u32, name: &str) -> MemberRecord {
        MemberRecord {
            uid: uid.to_string(),
            father_uid: None,
            generation,
            name: name.to_string(),
            gender: Gender::Male,
            sibling_order: None,
            is_alive: true,
            birth_date: Some(FieldValue::Int(1990)),
            death_date: None,
            spouse: None,
            official_position: None,
            residence_place: None,
            bio: None,
        }
    }

    #[test]
    fn test_collection_file_names() {
        assert_eq!(collection_file_name(3), "G3.yaml");
        assert_eq!(parse_collection_file_name("G3.yaml"), Some(3));
        assert_eq!(parse_collection_file_name("G12.yaml"), Some(12));
        assert_eq!(parse_collection_file_name("G3.yml"), None);
        assert_eq!(parse_collection_file_name("Gx.yaml"), None);
        assert_eq!(parse_collection_file_name("notes.yaml"), None);
    }

    #[test]
    fn test_first_append_creates_dir_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("family_data");
        let mut store = YamlStore::new(&base);
        assert!(!base.exists());

        let location = store.append(3, &make_record("G3-abc123", 3, "Li Wei")).unwrap();
        assert!(base.join("G3.yaml").exists());
        assert!(location.ends_with("G3.yaml"));
    }

    #[test]
    fn test_append_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = YamlStore::new(dir.path());
        let r1 = make_record("G2-aaaaaa", 2, "甲");
        let r2 = make_record("G2-bbbbbb", 2, "乙");
        store.append(2, &r1).unwrap();
        store.append(2, &r2).unwrap();
        assert_eq!(store.load(2).unwrap(), vec![r1, r2]);
    }

    #[test]
    fn test_generations_are_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = YamlStore::new(dir.path());
        store.append(5, &make_record("G5-aaaaaa", 5, "A")).unwrap();
        store.append(1, &make_record("G1-bbbbbb", 1, "B")).unwrap();
        fs::write(dir.path().join("readme.txt"), "ignored").unwrap();
        assert_eq!(store.generations().unwrap(), vec![1, 5]);
        assert_eq!(store.load(5).unwrap().len(), 1);
        assert!(store.load(9).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_recovered_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("G4.yaml"), "- uid: [unclosed\n  : :").unwrap();
        let mut store = YamlStore::new(dir.path());
        let rec = make_record("G4-cccccc", 4, "丙");
        store.append(4, &rec).unwrap();
        assert_eq!(store.load(4).unwrap(), vec![rec]);
    }

    #[test]
    fn test_non_sequence_recovered_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("G4.yaml"), "uid: G4-oldold\n").unwrap();
        let mut store = YamlStore::new(dir.path());
        let rec = make_record("G4-dddddd", 4, "丁");
        store.append(4, &rec).unwrap();
        assert_eq!(store.load(4).unwrap(), vec![rec]);
    }

    #[test]
    fn test_corrupt_file_fails_under_strict_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("G4.yaml");
        let garbage = "- uid: [unclosed\n  : :";
        fs::write(&path, garbage).unwrap();
        let mut store = YamlStore::new(dir.path()).with_corrupt_policy(CorruptPolicy::Fail);
        let err = store
            .append(4, &make_record("G4-eeeeee", 4, "戊"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::CorruptCollection { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), garbage);
    }

    #[test]
    fn test_empty_file_is_empty_collection() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("G6.yaml"), "\n").unwrap();
        let mut store = YamlStore::new(dir.path()).with_corrupt_policy(CorruptPolicy::Fail);
        store.append(6, &make_record("G6-ffffff", 6, "己")).unwrap();
        assert_eq!(store.load(6).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_keys_survive_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("G7.yaml");
        fs::write(&path, "- uid: G7-legacy\n  name: 旧\n  zi: 子明\n").unwrap();
        let mut store = YamlStore::new(dir.path());
        store.append(7, &make_record("G7-gggggg", 7, "庚")).unwrap();

        let entries = store.read_entries(7).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["zi"].as_str(), Some("子明"));
        assert_eq!(entries[1]["uid"].as_str(), Some("G7-gggggg"));
    }

    #[test]
    fn test_file_is_block_style_unicode() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = YamlStore::new(dir.path());
        let mut rec = make_record("G3-abc123", 3, "李伟");
        rec.gender = Gender::Female;
        store.append(3, &rec).unwrap();

        let text = fs::read_to_string(dir.path().join("G3.yaml")).unwrap();
        assert!(text.starts_with("- uid: G3-abc123\n"));
        assert!(text.contains("  name: 李伟\n"));
        assert!(text.contains("  gender: 女\n"));
        assert!(text.contains("  bio: null"));
        assert!(!text.contains("\\u"));
    }

    #[test]
    fn test_non_atomic_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = YamlStore::new(dir.path()).with_atomic_writes(false);
        store.append(1, &make_record("G1-hhhhhh", 1, "辛")).unwrap();
        store.append(1, &make_record("G1-iiiiii", 1, "壬")).unwrap();
        assert_eq!(store.load(1).unwrap().len(), 2);
        assert!(!store.atomic_writes());
        assert!(YamlStore::new(dir.path()).atomic_writes());
    }

    #[test]
    fn test_malformed_entries_skipped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("G8.yaml"), "- just a string\n").unwrap();
        let mut store = YamlStore::new(dir.path());
        store.append(8, &make_record("G8-jjjjjj", 8, "癸")).unwrap();
        let records = store.load(8).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].uid, "G8-jjjjjj");
        assert_eq!(store.read_entries(8).unwrap().len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_append_keeps_collection_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("G3.yaml");
        fs::write(&path, "").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let mut store = YamlStore::new(dir.path());
        store.append(3, &make_record("G3-kkkkkk", 3, "子")).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn test_yes_no_style_text_stays_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("G2.yaml");
        fs::write(&path, "- uid: G2-legacy\n  spouse: 'yes'\n  sibling_order: '1_000'\n").unwrap();

        let mut store = YamlStore::new(dir.path());
        let mut rec = make_record("G2-llllll", 2, "丑");
        rec.spouse = Some("no".into());
        rec.sibling_order = Some(FieldValue::Text("1_000".into()));
        store.append(2, &rec).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("  spouse: 'yes'\n"));
        assert_eq!(text.matches("  sibling_order: '1_000'\n").count(), 2);
        assert!(text.contains("  spouse: 'no'\n"));
        assert_eq!(store.load(2).unwrap(), vec![rec]);
        assert_eq!(store.read_entries(2).unwrap()[0]["spouse"].as_str(), Some("yes"));
    }
}
