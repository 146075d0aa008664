//! Ordered string-keyed documents.

use crate::model::Value;

/// An ordered mapping from element name to value.
///
/// Insertion order is kept and determines the encoded byte order, but it is
/// not part of equality: two documents are equal if they hold the same
/// key/value pairs.
#[derive(Debug, Clone, Default)]
pub struct Document {
    entries: Vec<(String, Value)>,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty document with room for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Inserts a value, returning the previous one.
    ///
    /// Replacing an existing key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(idx) => Some(std::mem::replace(&mut self.entries[idx].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.position(key).map(|idx| &self.entries[idx].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.position(key).map(|idx| &mut self.entries[idx].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Removes a key, shifting later elements down to keep their order.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.position(key).map(|idx| self.entries.remove(idx).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over elements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|v| v == value))
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut doc = Document::new();
        doc.extend(iter);
        doc
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Document {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

/// Builds a [`Document`] from `key => value` pairs.
///
/// ```rust
/// use simple_bson::{doc, Value};
///
/// let d = doc! { "a" => 1, "nested" => doc! { "b" => "x" } };
/// assert_eq!(d.get("a"), Some(&Value::Int32(1)));
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::Document::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut doc = $crate::Document::new();
        $( doc.insert($key, $value); )+
        doc
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_position() {
        let mut doc = doc! { "a" => 1, "b" => 2, "c" => 3 };
        let previous = doc.insert("b", "two");

        assert_eq!(previous, Some(Value::Int32(2)));
        assert_eq!(doc.keys().collect::<Vec<_>>(), ["a", "b", "c"]);
        assert_eq!(doc.get("b"), Some(&Value::from("two")));
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut doc = doc! { "a" => 1, "b" => 2, "c" => 3 };
        assert_eq!(doc.remove("b"), Some(Value::Int32(2)));
        assert_eq!(doc.remove("missing"), None);
        assert_eq!(doc.keys().collect::<Vec<_>>(), ["a", "c"]);
    }

    #[test]
    fn test_equality_ignores_order() {
        let a = doc! { "x" => 1, "y" => true };
        let b = doc! { "y" => true, "x" => 1 };
        let c = doc! { "x" => 1, "y" => false };

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, doc! { "x" => 1 });
    }

    #[test]
    fn test_collect() {
        let doc: Document = vec![("k1", 1), ("k2", 2)].into_iter().collect();
        assert_eq!(doc.len(), 2);
        assert!(doc.contains_key("k2"));
        assert!(!doc.is_empty());
    }
}
