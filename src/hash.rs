//! MD5 content digests for identifier seeding.
//!
//! Used as a fingerprint, never for anything security sensitive.

use md5::{Digest, Md5};

/// Compute the MD5 digest of data, returns 16 bytes.
pub fn md5_128(data: &[u8]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut out = [0u8; 16];
    out.copy_from_slice(&result);
    out
}

/// Compute the MD5 digest and return it as a big-endian integer.
pub fn md5_u128(data: &[u8]) -> u128 {
    u128::from_be_bytes(md5_128(data))
}

/// Compute the MD5 digest and return hex string.
pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(md5_128(data))
}
