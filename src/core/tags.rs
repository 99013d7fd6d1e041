use serde::{Deserialize, Serialize};

use crate::core::read::Mate;

/// Separator between tags in a recoded read name
pub const TAG_SEPARATOR: char = ';';

/// Separator between a tag key and its value
pub const KEY_VALUE_SEPARATOR: char = ':';

/// Ordered set of `KEY:value` tags carried in a recoded read name.
///
/// Inserting an existing key replaces its value in place, so the output order
/// is the order in which keys were first set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet {
    tags: Vec<(String, String)>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a tag. Separator characters and whitespace in the value are replaced by `_`.
    pub fn insert(&mut self, key: &str, value: impl AsRef<str>) {
        let value = sanitize_value(value.as_ref());
        if let Some(slot) = self.tags.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            self.tags.push((key.to_string(), value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render as a read name: `Is:NS500414;RN:362;...`
    pub fn to_read_name(&self) -> String {
        self.tags
            .iter()
            .map(|(k, v)| format!("{k}{KEY_VALUE_SEPARATOR}{v}"))
            .collect::<Vec<_>>()
            .join(&TAG_SEPARATOR.to_string())
    }
}

fn sanitize_value(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c == TAG_SEPARATOR || c.is_whitespace() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// A classified read pair: the tags describing it and its (possibly trimmed) mates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecodedRecord {
    pub tags: TagSet,
    pub mates: Vec<Mate>,
}

impl RecodedRecord {
    pub fn new(tags: TagSet, mates: Vec<Mate>) -> Self {
        Self { tags, mates }
    }

    /// Read name shared by every mate of the recoded record
    pub fn read_name(&self) -> String {
        self.tags.to_read_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_in_place() {
        let mut tags = TagSet::new();
        tags.insert("SM", "a");
        tags.insert("RX", "ACG");
        tags.insert("SM", "b");
        assert_eq!(tags.to_read_name(), "SM:b;RX:ACG");
    }

    #[test]
    fn test_values_are_sanitized() {
        let mut tags = TagSet::new();
        tags.insert("Rn", "SRR1.1 extra;bits");
        assert_eq!(tags.get("Rn"), Some("SRR1.1_extra_bits"));
    }

    #[test]
    fn test_value_may_contain_key_separator() {
        let mut tags = TagSet::new();
        tags.insert("aA", "ACGT+TTGA");
        tags.insert("Fc", "x:y");
        assert_eq!(tags.to_read_name(), "aA:ACGT+TTGA;Fc:x:y");
    }
}
