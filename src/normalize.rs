//! Name normalization for reference matching.
//!
//! Matching is exact equality after trimming surrounding whitespace.
//! Administrative suffixes (省, 市, 县, 区, 自治州, ...) are kept: stripping
//! them merges unrelated regions that share a stem, e.g. 吉林省 and 吉林市.

/// Reduce a raw name to its matching key.
pub fn normalize_name(name: &str) -> &str {
    name.trim()
}

/// True if `a` and `b` normalize to the same key.
pub fn names_match(a: &str, b: &str) -> bool {
    normalize_name(a) == normalize_name(b)
}
