//! Member identifiers: `G{generation}-{6 base-62 chars}`.
//!
//! The suffix is the tail of a base-62 rendering of an MD5 fingerprint over
//! wall-clock millis, a checksum of the name and a random salt. Nothing here
//! consults the store, so two members can in principle share an identifier.

use std::fmt::Display;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use tracing::debug;

use crate::hash::{md5_hex, md5_u128};

/// Base-62 alphabet: digits, lowercase, uppercase.
pub const BASE62_ALPHABET: &[u8; 62] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of the identifier suffix after `G{generation}-`.
pub const SUFFIX_LEN: usize = 6;

const PAD_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const SALT_RANGE: std::ops::RangeInclusive<u32> = 10_000..=99_999;

/// Encode an unsigned integer in base 62. Zero encodes as `"0"`.
pub fn base62_encode(mut num: u128) -> String {
    if num == 0 {
        return (BASE62_ALPHABET[0] as char).to_string();
    }
    let mut digits = Vec::with_capacity(22);
    while num > 0 {
        digits.push(BASE62_ALPHABET[(num % 62) as usize]);
        num /= 62;
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

/// Sum of the Unicode scalar values of `name`.
pub fn name_checksum(name: &str) -> u64 {
    name.chars().map(|c| c as u64).sum()
}

/// Seed string hashed into the fingerprint.
pub fn fingerprint_seed(millis: u128, checksum: u64, salt: u32) -> String {
    format!("{millis}-{checksum}-{salt}")
}

/// Last [`SUFFIX_LEN`] characters of the base-62 digest, right-padded with
/// random alphanumerics when the encoding is shorter.
pub fn suffix_from_digest<R: Rng + ?Sized>(digest: u128, rng: &mut R) -> String {
    let encoded = base62_encode(digest);
    let start = encoded.len().saturating_sub(SUFFIX_LEN);
    let mut suffix = encoded[start..].to_string();
    while suffix.len() < SUFFIX_LEN {
        let idx = rng.gen_range(0..PAD_ALPHABET.len());
        suffix.push(PAD_ALPHABET[idx] as char);
    }
    suffix
}

/// Generate an identifier with an explicit rng and clock reading.
pub fn generate_with<R: Rng + ?Sized>(
    rng: &mut R,
    millis: u128,
    generation: impl Display,
    name: &str,
) -> String {
    let salt = rng.gen_range(SALT_RANGE);
    let seed = fingerprint_seed(millis, name_checksum(name), salt);
    debug!(%seed, digest = %md5_hex(seed.as_bytes()), "uid fingerprint");
    let suffix = suffix_from_digest(md5_u128(seed.as_bytes()), rng);
    format!("G{generation}-{suffix}")
}

/// Generate a new identifier for a member of `generation` named `name`.
pub fn generate(generation: impl Display, name: &str) -> String {
    generate_with(&mut rand::thread_rng(), now_millis(), generation, name)
}

/// Check the `G<label>-XXXXXX` shape of an identifier.
pub fn is_well_formed(uid: &str) -> bool {
    let Some(rest) = uid.strip_prefix('G') else {
        return false;
    };
    let Some((label, suffix)) = rest.rsplit_once('-') else {
        return false;
    };
    !label.is_empty()
        && suffix.len() == SUFFIX_LEN
        && suffix.bytes().all(|b| b.is_ascii_alphanumeric())
}

fn now_millis() -> u128 {
    // A clock before the epoch only degrades entropy; fall back to zero.
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
