//! Summary counts over stored collections.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Local};
use serde::Serialize;

use crate::errors::Result;
use crate::record::{FieldValue, Gender, MemberRecord};
use crate::storage::GenerationStore;

/// How many generation characters to report.
pub const TOP_GENERATION_CHARS: usize = 10;

/// Ten-year age bands, the last one open-ended.
pub const AGE_GROUP_LABELS: [&str; 9] = [
    "0-10", "11-20", "21-30", "31-40", "41-50", "51-60", "61-70", "71-80", "80+",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub total: usize,
    pub male: usize,
    pub female: usize,
    pub alive: usize,
    pub deceased: usize,
    /// Member count per generation, ascending.
    pub per_generation: BTreeMap<u32, usize>,
    /// Most frequent second characters of names, with counts.
    pub generation_chars: Vec<(char, usize)>,
    /// Living members with an integer birth year, per age band. Every band
    /// is listed, in [`AGE_GROUP_LABELS`] order.
    pub age_groups: Vec<(&'static str, usize)>,
}

/// Band index for `age`; `None` for a birth year in the future.
fn age_group(age: i64) -> Option<usize> {
    match age {
        i64::MIN..=-1 => None,
        0..=10 => Some(0),
        11..=80 => Some(((age - 1) / 10) as usize),
        _ => Some(AGE_GROUP_LABELS.len() - 1),
    }
}

impl LedgerStats {
    /// Statistics with ages taken relative to the current local year.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a MemberRecord>) -> Self {
        Self::from_records_at(records, Local::now().year())
    }

    pub fn from_records_at<'a>(
        records: impl IntoIterator<Item = &'a MemberRecord>,
        current_year: i32,
    ) -> Self {
        let mut stats = Self::default();
        let mut chars: HashMap<char, usize> = HashMap::new();
        let mut ages = [0usize; AGE_GROUP_LABELS.len()];
        for record in records {
            stats.total += 1;
            match record.gender {
                Gender::Male => stats.male += 1,
                Gender::Female => stats.female += 1,
            }
            if record.is_alive {
                stats.alive += 1;
                if let Some(FieldValue::Int(born)) = record.birth_date {
                    if let Some(band) = age_group(i64::from(current_year) - born) {
                        ages[band] += 1;
                    }
                }
            } else {
                stats.deceased += 1;
            }
            *stats.per_generation.entry(record.generation).or_default() += 1;
            if let Some(c) = record.name.chars().nth(1) {
                *chars.entry(c).or_default() += 1;
            }
        }
        let mut ranked: Vec<(char, usize)> = chars.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(TOP_GENERATION_CHARS);
        stats.generation_chars = ranked;
        stats.age_groups = AGE_GROUP_LABELS.into_iter().zip(ages).collect();
        stats
    }

    /// Collect statistics over every generation in `store`.
    pub fn collect<S: GenerationStore + ?Sized>(store: &S) -> Result<Self> {
        let mut records = Vec::new();
        for generation in store.generations()? {
            records.extend(store.load(generation)?);
        }
        Ok(Self::from_records(&records))
    }
}
