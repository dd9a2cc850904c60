use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const ENABLE_MTOM: &str = "request@enable-mtom";
pub const FORCE_MTOM: &str = "request@force-mtom";
pub const ENCODE_ATTACHMENTS: &str = "request@encode-attachments";
pub const INLINE_RESPONSE_ATTACHMENTS: &str = "request@inline-response-attachments";
pub const EXPAND_MTOM_RESPONSE_ATTACHMENTS: &str = "request@expand-mtom-attachments";
pub const ENABLE_INLINE_FILES: &str = "request@enable-inline-files";
pub const SKIP_SOAP_ACTION: &str = "request@skip-soap-action";
pub const WSS_TIME_TO_LIVE: &str = "request@wss-time-to-live";

/// String-keyed settings persisted with a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    values: BTreeMap<String, String>,
}

impl Settings {
    /// Missing keys read as `false`.
    pub fn get_bool(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(|v| v == "true")
    }

    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.values.insert(key.to_owned(), value.to_string());
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// `None` removes the key.
    pub fn set_string(&mut self, key: &str, value: Option<String>) {
        match value {
            Some(value) => {
                self.values.insert(key.to_owned(), value);
            }
            None => {
                self.values.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleans_default_to_false() {
        let mut settings = Settings::default();
        assert!(!settings.get_bool(ENABLE_MTOM));
        settings.set_bool(ENABLE_MTOM, true);
        assert!(settings.get_bool(ENABLE_MTOM));
        settings.set_bool(ENABLE_MTOM, false);
        assert!(!settings.get_bool(ENABLE_MTOM));
    }

    #[test]
    fn clearing_a_string_removes_it() {
        let mut settings = Settings::default();
        settings.set_string(WSS_TIME_TO_LIVE, Some("300".into()));
        assert_eq!(settings.get_string(WSS_TIME_TO_LIVE), Some("300"));
        settings.set_string(WSS_TIME_TO_LIVE, None);
        assert_eq!(settings.get_string(WSS_TIME_TO_LIVE), None);
    }
}
