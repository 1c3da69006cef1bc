//! MemberRecord: one person in the lineage.
//!
//! Field declaration order is the serialized key order; serde emits struct
//! fields in declaration order, so never reorder them.

use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};
use crate::uid;

/// Integer-or-text value used for sibling rank and years.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Text(String),
}

impl FieldValue {
    /// Coerce raw input: blank is absent, all-digit input that fits is an
    /// integer, everything else is kept as text.
    pub fn coerce(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = trimmed.parse::<i64>() {
                return Some(Self::Int(n));
            }
        }
        Some(Self::Text(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    #[serde(rename = "男")]
    Male,
    #[serde(rename = "女")]
    Female,
}

impl Gender {
    /// Parse a gender answer; anything not recognised as female is male.
    pub fn from_input(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "f" | "0" | "女" | "female" => Self::Female,
            _ => Self::Male,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Male => "男",
            Self::Female => "女",
        }
    }
}

/// A single member record as stored in a generation collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub uid: String,
    pub father_uid: Option<String>,
    pub generation: u32,
    pub name: String,
    pub gender: Gender,
    pub sibling_order: Option<FieldValue>,
    pub is_alive: bool,
    pub birth_date: Option<FieldValue>,
    pub death_date: Option<FieldValue>,
    pub spouse: Option<String>,
    pub official_position: Option<String>,
    /// Key spelling matches files written by the earlier entry tool.
    #[serde(rename = "residence_plac", alias = "residence_place")]
    pub residence_place: Option<String>,
    pub bio: Option<String>,
}

/// Field keys in serialized order.
pub const FIELD_ORDER: [&str; 13] = [
    "uid",
    "father_uid",
    "generation",
    "name",
    "gender",
    "sibling_order",
    "is_alive",
    "birth_date",
    "death_date",
    "spouse",
    "official_position",
    "residence_plac",
    "bio",
];

/// User-supplied fields for a member, before an identifier is assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberDraft {
    pub father_uid: Option<String>,
    pub generation: u32,
    pub name: String,
    pub gender: Gender,
    pub sibling_order: Option<FieldValue>,
    pub is_alive: bool,
    pub birth_date: Option<FieldValue>,
    pub death_date: Option<FieldValue>,
    pub spouse: Option<String>,
    pub official_position: Option<String>,
    pub residence_place: Option<String>,
    pub bio: Option<String>,
}

impl MemberDraft {
    pub fn new(generation: u32, name: impl Into<String>) -> Self {
        Self {
            generation,
            name: name.into(),
            is_alive: true,
            ..Default::default()
        }
    }

    /// Assemble the record under a freshly generated identifier.
    pub fn into_record(self) -> Result<MemberRecord> {
        let uid = uid::generate(self.generation, self.name.trim());
        self.into_record_with_uid(uid)
    }

    /// Assemble the record under a caller-supplied identifier.
    ///
    /// A death date on a living member is dropped.
    pub fn into_record_with_uid(self, uid: String) -> Result<MemberRecord> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(LedgerError::MissingName);
        }
        Ok(MemberRecord {
            uid,
            father_uid: non_blank(self.father_uid),
            generation: self.generation,
            name: name.to_string(),
            gender: self.gender,
            sibling_order: self.sibling_order,
            is_alive: self.is_alive,
            birth_date: self.birth_date,
            death_date: if self.is_alive { None } else { self.death_date },
            spouse: non_blank(self.spouse),
            official_position: non_blank(self.official_position),
            residence_place: non_blank(self.residence_place),
            bio: non_blank(self.bio),
        })
    }
}

/// Trim optional text, mapping blank to absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse a generation label into its number.
pub fn parse_generation(label: &str) -> Result<u32> {
    let trimmed = label.trim();
    trimmed
        .parse::<u32>()
        .map_err(|_| LedgerError::InvalidGeneration(trimmed.to_string()))
}
