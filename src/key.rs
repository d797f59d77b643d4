//! Object key generation.
//!
//! Keys look like `1700000000000-ab12cd3ef45g.webp`: the current Unix time
//! in milliseconds plus a random base-36 suffix, unique enough without any
//! coordination between uploaders. The alphabet is restricted to
//! `[0-9a-z]`, `-` and the extension dot, so keys are URL-path-safe as-is.

use chrono::Utc;
use rand::Rng;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 12;

/// Generates a fresh object key with the given extension (`"webp"`).
pub fn object_key(extension: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!(
        "{}-{}.{}",
        Utc::now().timestamp_millis(),
        suffix,
        extension.trim_start_matches('.')
    )
}
