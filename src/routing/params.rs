//! Path parameters extracted by pattern matching.

use std::collections::hash_map::{HashMap, Iter};
use std::str::FromStr;

/// Placeholder values captured from a matched path, keyed by placeholder name.
///
/// Values are always raw strings; use [`PathParams::parse`] to convert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the raw value captured for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Parse the value captured for `name`.
    ///
    /// Returns `None` when the placeholder is absent or the value does not parse.
    pub fn parse<T: FromStr>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|value| value.parse().ok())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Merge `other` into `self`. Values from `other` win on conflicts.
    pub fn merge(&mut self, other: PathParams) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, String, String> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a PathParams {
    type Item = (&'a String, &'a String);
    type IntoIter = Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for PathParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_converts_values() {
        let params: PathParams = [("pk", "42"), ("slug", "tacos")].into_iter().collect();
        assert_eq!(params.parse::<u32>("pk"), Some(42));
        assert_eq!(params.parse::<u32>("slug"), None);
        assert_eq!(params.parse::<u32>("missing"), None);
    }

    #[test]
    fn merge_prefers_incoming_values() {
        let mut params: PathParams = [("a", "1"), ("b", "2")].into_iter().collect();
        params.merge([("b", "3"), ("c", "4")].into_iter().collect());

        assert_eq!(params.len(), 3);
        assert_eq!(params.get("a"), Some("1"));
        assert_eq!(params.get("b"), Some("3"));
        assert_eq!(params.get("c"), Some("4"));
    }
}
