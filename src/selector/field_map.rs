use serde::ser::{Serialize, SerializeMap, Serializer};

/// An insertion-ordered mapping of field key to extracted values
///
/// Keys keep the order in which they were first inserted, which for
/// extraction results is the order of the `SelectorSpec`. Serializes as a
/// JSON object in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    entries: Vec<(String, Vec<String>)>,
}

/// Fields extracted from a single page
pub type Fields = FieldMap;

impl FieldMap {
    /// Creates an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a map with every key present and no values
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = Self::new();
        for key in keys {
            map.values_mut(key.into());
        }
        map
    }

    /// Returns the values for a key, if the key is present
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values.as_slice())
    }

    /// Returns the values for a key, inserting the key at the end if missing
    pub fn values_mut(&mut self, key: String) -> &mut Vec<String> {
        let index = match self.entries.iter().position(|(k, _)| *k == key) {
            Some(index) => index,
            None => {
                self.entries.push((key, Vec::new()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }

    /// Appends a single value to a key
    pub fn push(&mut self, key: &str, value: String) {
        self.values_mut(key.to_string()).push(value);
    }

    /// Appends every value of `other`, key by key
    pub fn append(&mut self, other: &FieldMap) {
        for (key, values) in &other.entries {
            self.values_mut(key.clone()).extend(values.iter().cloned());
        }
    }

    /// Iterates over keys and their values in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    /// Iterates over keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of values across all keys
    pub fn value_count(&self) -> usize {
        self.entries.iter().map(|(_, values)| values.len()).sum()
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, values) in &self.entries {
            map.serialize_entry(key, values)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_keys_keeps_order() {
        let map = FieldMap::with_keys(["title", "links", "paragraphs"]);
        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys, vec!["title", "links", "paragraphs"]);
        assert_eq!(map.get("links"), Some(&[][..]));
        assert_eq!(map.value_count(), 0);
    }

    #[test]
    fn test_push_and_get() {
        let mut map = FieldMap::new();
        map.push("links", "/x".to_string());
        map.push("links", "/y".to_string());
        map.push("title", "Hello".to_string());

        assert_eq!(map.get("links").unwrap(), ["/x", "/y"]);
        assert_eq!(map.get("title").unwrap(), ["Hello"]);
        assert!(map.get("missing").is_none());
        assert_eq!(map.len(), 2);
        assert_eq!(map.value_count(), 3);
    }

    #[test]
    fn test_append_merges_by_key() {
        let mut total = FieldMap::with_keys(["a", "b"]);

        let mut page = FieldMap::new();
        page.push("b", "1".to_string());
        page.push("c", "2".to_string());
        total.append(&page);
        total.append(&page);

        assert_eq!(total.get("a").unwrap().len(), 0);
        assert_eq!(total.get("b").unwrap(), ["1", "1"]);
        assert_eq!(total.get("c").unwrap(), ["2", "2"]);
        let keys: Vec<_> = total.keys().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_serializes_in_insertion_order() {
        let mut map = FieldMap::with_keys(["zeta", "alpha"]);
        map.push("zeta", "z".to_string());

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"zeta":["z"],"alpha":[]}"#);
    }
}
