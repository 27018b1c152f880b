//! SHA-256 fingerprints via `ring::digest`.

use ring::digest::{digest, SHA256};

/// Human-facing fingerprint: uppercase hex pairs separated by colons,
/// prefixed with the digest name.
///
/// `(SHA256) 0A:1B:...`
#[must_use]
pub fn fingerprint(der: &[u8]) -> String {
    let hex = hex::encode_upper(digest(&SHA256, der).as_ref());
    let pairs: Vec<&str> = hex
        .as_bytes()
        .chunks(2)
        .filter_map(|pair| std::str::from_utf8(pair).ok())
        .collect();
    format!("(SHA256) {}", pairs.join(":"))
}
