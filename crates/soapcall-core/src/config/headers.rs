use serde::{Deserialize, Serialize};

/// Ordered header map. Inserting an existing name replaces the value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestHeaders {
    entries: Vec<(String, String)>,
}

impl RequestHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the previous value when `name` was already present.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_overwrite_in_place() {
        let mut headers = RequestHeaders::new();
        assert_eq!(headers.insert("X-A", "1"), None);
        headers.insert("X-B", "2");
        assert_eq!(headers.insert("X-A", "3"), Some("1".to_owned()));

        let collected: Vec<_> = headers.iter().collect();
        assert_eq!(collected, vec![("X-A", "3"), ("X-B", "2")]);
    }

    #[test]
    fn remove_keeps_order_of_the_rest() {
        let mut headers: RequestHeaders = [("a", "1"), ("b", "2"), ("c", "3")].into_iter().collect();
        assert_eq!(headers.remove("b").as_deref(), Some("2"));
        assert_eq!(headers.remove("b"), None);
        assert_eq!(headers.iter().map(|(k, _)| k).collect::<Vec<_>>(), vec!["a", "c"]);
    }
}
