//! Collection rendering that stays unambiguous for YAML 1.1 readers.
//!
//! serde_yaml follows YAML 1.2, so strings such as `yes`, `off` or `1_000`
//! are written as plain scalars. Readers on YAML 1.1 (PyYAML among them)
//! resolve those to booleans, numbers or dates. Any string that a 1.1
//! resolver would not read back as a string is emitted single-quoted.

use rand::Rng;
use serde_yaml::{Mapping, Value};

use crate::errors::Result;

const BOOL_WORDS: [&str; 10] = ["y", "n", "yes", "no", "on", "off", "true", "false", "null", "~"];

/// True when a YAML 1.1 resolver would read `s`, written plain, as
/// something other than a string.
pub fn is_ambiguous_plain(s: &str) -> bool {
    if s.is_empty() || s == "<<" || s == "=" {
        return true;
    }
    if BOOL_WORDS.iter().any(|w| s.eq_ignore_ascii_case(w)) {
        return true;
    }
    let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
    let lower = unsigned.to_ascii_lowercase();
    if matches!(lower.as_str(), ".inf" | ".nan") {
        return true;
    }
    looks_numeric(unsigned) || looks_like_date(s)
}

/// Ints in any 1.1 base, floats, and base-60 forms such as `1:20`.
fn looks_numeric(s: &str) -> bool {
    match s.as_bytes().first() {
        Some(b) if b.is_ascii_digit() || *b == b'.' => {}
        _ => return false,
    }
    s.bytes().any(|b| b.is_ascii_digit())
        && s.bytes().all(|b| {
            b.is_ascii_hexdigit()
                || matches!(b, b'_' | b'.' | b':' | b'x' | b'X' | b'o' | b'O' | b'+' | b'-')
        })
}

/// `YYYY-M-D` prefix of a 1.1 timestamp.
fn looks_like_date(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 8
        && b[..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[5].is_ascii_digit()
}

/// Serialize `entries` as a block-style sequence, quoting ambiguous strings.
pub fn render(entries: &[Value]) -> Result<String> {
    // serde_yaml has no per-scalar style control: ambiguous strings are swapped
    // for unique plain tokens, then the tokens are replaced by quoted text.
    let nonce: u64 = rand::thread_rng().gen();
    let mut quoted = Vec::new();
    let masked: Vec<Value> = entries
        .iter()
        .map(|entry| mask(entry, nonce, &mut quoted))
        .collect();
    let mut yaml = serde_yaml::to_string(&masked)?;
    for (index, original) in quoted.iter().enumerate() {
        yaml = yaml.replacen(&token(nonce, index), &single_quoted(original), 1);
    }
    Ok(yaml)
}

fn token(nonce: u64, index: usize) -> String {
    format!("flq{nonce:016x}n{index}z")
}

fn single_quoted(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn mask(value: &Value, nonce: u64, quoted: &mut Vec<String>) -> Value {
    match value {
        Value::String(s) if is_ambiguous_plain(s) => {
            let masked = token(nonce, quoted.len());
            quoted.push(s.clone());
            Value::String(masked)
        }
        Value::Sequence(items) => {
            Value::Sequence(items.iter().map(|v| mask(v, nonce, quoted)).collect())
        }
        Value::Mapping(map) => {
            let mut out = Mapping::with_capacity(map.len());
            for (k, v) in map {
                let key = mask(k, nonce, quoted);
                out.insert(key, mask(v, nonce, quoted));
            }
            Value::Mapping(out)
        }
        Value::Tagged(tagged) => {
            let mut tagged = (**tagged).clone();
            tagged.value = mask(&tagged.value, nonce, quoted);
            Value::Tagged(Box::new(tagged))
        }
        other => other.clone(),
    }
}
