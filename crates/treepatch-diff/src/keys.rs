//! Key escaping and control-key recognition.
//!
//! Patches reuse the same record shape for both flavors, so user record keys
//! that start with the marker character get one extra marker prepended. A
//! single leading marker is then reserved for control keys: [`REMOVED_KEY`]
//! and the sequence index keys `_0`, `_1`, ...

/// The marker character that introduces control keys.
pub const MARKER: char = '_';

/// Control key listing removed record keys, or holding a sequence's new length.
pub const REMOVED_KEY: &str = "_r";

/// Escape a user record key for use inside a record patch.
pub fn escape_key(key: &str) -> String {
    if key.starts_with(MARKER) {
        let mut escaped = String::with_capacity(key.len() + 1);
        escaped.push(MARKER);
        escaped.push_str(key);
        escaped
    } else {
        key.to_owned()
    }
}

/// Undo [`escape_key`]: strip exactly one leading marker if present.
pub fn unescape_key(key: &str) -> &str {
    key.strip_prefix(MARKER).unwrap_or(key)
}

/// Returns `true` if `key` has the reserved single-marker form of a control
/// key, i.e. it could not have been produced by [`escape_key`] from a key
/// that starts with the marker.
pub fn is_control_form(key: &str) -> bool {
    key.starts_with(MARKER) && !key[MARKER.len_utf8()..].starts_with(MARKER)
}

/// The synthetic key for sequence index `index`.
pub fn index_key(index: usize) -> String {
    format!("{MARKER}{index}")
}

/// Parse a sequence index key. Only canonical decimals are accepted, so
/// `_01` and `_+1` are rejected.
pub fn parse_index_key(key: &str) -> Option<usize> {
    let digits = key.strip_prefix(MARKER)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    digits.parse().ok()
}
