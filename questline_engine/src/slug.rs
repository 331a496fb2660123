//! Filesystem names for storage keys and save slots.

use std::fmt::Write as _;

/// File stem for a storage key. Distinct keys always get distinct stems.
///
/// Lowercase ASCII letters, digits, `_` and `-` pass through; every other byte
/// of the UTF-8 encoding becomes `%XX`. Uppercase letters are escaped too so
/// case-insensitive filesystems cannot fold two keys together. The empty key
/// maps to a lone `%`, which no escape sequence produces.
pub fn key_file_stem(key: &str) -> String {
    if key.is_empty() {
        return "%".to_string();
    }
    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' => stem.push(char::from(byte)),
            _ => {
                let _ = write!(stem, "%{byte:02X}");
            },
        }
    }
    stem
}

/// Directory name for a player-facing slot name.
///
/// Runs of anything other than ASCII letters and digits collapse to a single
/// `-`, so "Slot 2" and "slot_2" share a directory. Names with no letters or
/// digits fall back to `default`.
pub fn slot_dir_name(slot: &str) -> String {
    let words: Vec<String> = slot
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    if words.is_empty() {
        "default".to_string()
    } else {
        words.join("-")
    }
}
