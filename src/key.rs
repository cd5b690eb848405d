//! Key-name to key-code table.

use std::collections::HashMap;

/// Named keys and their codes, in addition to `0`-`9` and `A`-`Z`.
const NAMED_KEYS: &[(&str, u32)] = &[
    ("BACKSPACE", 8),
    ("TAB", 9),
    ("RETURN", 13),
    ("ENTER", 14),
    ("PAUSE", 19),
    ("ESCAPE", 27),
    ("SPACE", 32),
    ("PAGEUP", 33),
    ("PAGEDOWN", 34),
    ("END", 35),
    ("HOME", 36),
    ("LEFT", 37),
    ("UP", 38),
    ("RIGHT", 39),
    ("DOWN", 40),
    ("INSERT", 45),
    ("DELETE", 46),
    ("F1", 112),
    ("F2", 113),
    ("F3", 114),
    ("F4", 115),
    ("F5", 116),
    ("F6", 117),
    ("F7", 118),
    ("F8", 119),
    ("F9", 120),
    ("F10", 121),
    ("F11", 122),
    ("F12", 123),
    ("SCROLLLOCK", 145),
];

/// Mapping from canonical (uppercase) key names to numeric key codes.
///
/// The default table uses the DOM `keyCode` values, which is also what the
/// platform backends report. Callers may add their own names with
/// [`KeyCodeTable::insert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCodeTable {
    codes: HashMap<String, u32>,
}

impl KeyCodeTable {
    /// Create a table with no entries.
    pub fn empty() -> Self {
        Self {
            codes: HashMap::new(),
        }
    }

    /// Look up the code for a key name. Names are case-insensitive.
    pub fn get(&self, name: &str) -> Option<u32> {
        self.codes.get(&name.to_uppercase()).copied()
    }

    /// Add or replace a key name, returning the previous code if any.
    pub fn insert(&mut self, name: &str, code: u32) -> Option<u32> {
        self.codes.insert(name.to_uppercase(), code)
    }

    /// Remove a key name, returning its code if it was present.
    pub fn remove(&mut self, name: &str) -> Option<u32> {
        self.codes.remove(&name.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Iterate over `(name, code)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.codes.iter().map(|(name, code)| (name.as_str(), *code))
    }
}

impl Default for KeyCodeTable {
    fn default() -> Self {
        let mut codes: HashMap<String, u32> = NAMED_KEYS
            .iter()
            .map(|(name, code)| (name.to_string(), *code))
            .collect();
        for (offset, digit) in ('0'..='9').enumerate() {
            codes.insert(digit.to_string(), 48 + offset as u32);
        }
        for (offset, letter) in ('A'..='Z').enumerate() {
            codes.insert(letter.to_string(), 65 + offset as u32);
        }
        Self { codes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_letters_and_digits() {
        let table = KeyCodeTable::default();
        assert_eq!(table.get("A"), Some(65));
        assert_eq!(table.get("Z"), Some(90));
        assert_eq!(table.get("0"), Some(48));
        assert_eq!(table.get("9"), Some(57));
    }

    #[test]
    fn test_default_named_keys() {
        let table = KeyCodeTable::default();
        assert_eq!(table.get("ESCAPE"), Some(27));
        assert_eq!(table.get("RETURN"), Some(13));
        assert_eq!(table.get("ENTER"), Some(14));
        assert_eq!(table.get("SPACE"), Some(32));
        assert_eq!(table.get("DELETE"), Some(46));
        assert_eq!(table.get("F8"), Some(119));
        assert_eq!(table.len(), NAMED_KEYS.len() + 36);
    }

    #[test]
    fn test_lookup_case_insensitive() {
        let table = KeyCodeTable::default();
        assert_eq!(table.get("escape"), Some(27));
        assert_eq!(table.get("a"), Some(65));
    }

    #[test]
    fn test_unknown_key() {
        assert_eq!(KeyCodeTable::default().get("HYPER"), None);
        assert_eq!(KeyCodeTable::default().get(""), None);
    }

    #[test]
    fn test_extend_table() {
        let mut table = KeyCodeTable::default();
        assert_eq!(table.insert("semicolon", 186), None);
        assert_eq!(table.get("SEMICOLON"), Some(186));
        assert_eq!(table.insert("A", 1), Some(65));
        assert_eq!(table.remove("a"), Some(1));
        assert_eq!(table.get("A"), None);
    }

    #[test]
    fn test_empty_table() {
        let table = KeyCodeTable::empty();
        assert!(table.is_empty());
        assert_eq!(table.iter().count(), 0);
    }
}
