//! The owning service description of an operation.

use std::{
    fmt,
    sync::{Arc, Weak, atomic::AtomicU64},
};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::notify::ListenerId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoapVersion {
    #[default]
    #[serde(rename = "1.1")]
    Soap11,
    #[serde(rename = "1.2")]
    Soap12,
}

impl SoapVersion {
    /// Content type of a plain (non-multipart) message. SOAP 1.2 carries the
    /// action as a media type parameter instead of a `SOAPAction` header.
    pub fn content_type(self, encoding: &str, action: Option<&str>) -> String {
        match (self, action) {
            (Self::Soap11, _) => format!("text/xml;charset={encoding}"),
            (Self::Soap12, Some(action)) if !action.is_empty() => {
                format!("application/soap+xml;charset={encoding};action=\"{action}\"")
            }
            (Self::Soap12, _) => format!("application/soap+xml;charset={encoding}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceEvent {
    /// `old` is `None` for an added endpoint, `new` is `None` for a removed one.
    EndpointChanged {
        old: Option<String>,
        new: Option<String>,
    },
}

pub trait InterfaceListener: Send + Sync {
    fn interface_changed(&self, event: &InterfaceEvent);
}

/// Holds listeners weakly: registering never keeps the listener alive.
pub struct Interface {
    name: String,
    soap_version: SoapVersion,
    endpoints: RwLock<Vec<String>>,
    listeners: RwLock<Vec<(ListenerId, Weak<dyn InterfaceListener>)>>,
    next_listener_id: AtomicU64,
}

impl Interface {
    pub fn new<I, S>(name: impl Into<String>, soap_version: SoapVersion, endpoints: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            name: name.into(),
            soap_version,
            endpoints: RwLock::new(endpoints.into_iter().map(Into::into).collect()),
            listeners: RwLock::new(Vec::new()),
            next_listener_id: AtomicU64::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn soap_version(&self) -> SoapVersion {
        self.soap_version
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.endpoints.read().clone()
    }

    pub fn default_endpoint(&self) -> Option<String> {
        self.endpoints.read().first().cloned()
    }

    pub fn add_endpoint(&self, endpoint: impl Into<String>) {
        let endpoint = endpoint.into();
        {
            let mut endpoints = self.endpoints.write();
            if endpoints.contains(&endpoint) {
                return;
            }
            endpoints.push(endpoint.clone());
        }

        self.fire(&InterfaceEvent::EndpointChanged {
            old: None,
            new: Some(endpoint),
        });
    }

    pub fn remove_endpoint(&self, endpoint: &str) -> bool {
        {
            let mut endpoints = self.endpoints.write();
            let Some(index) = endpoints.iter().position(|e| e.as_str() == endpoint) else {
                return false;
            };
            endpoints.remove(index);
        }

        self.fire(&InterfaceEvent::EndpointChanged {
            old: Some(endpoint.to_owned()),
            new: None,
        });
        true
    }

    /// Replaces `old` with `new` in the endpoint list and tells the listeners.
    /// Returns `false` (and fires nothing) when `old` is not one of the endpoints.
    pub fn change_endpoint(&self, old: &str, new: impl Into<String>) -> bool {
        let new = new.into();
        if old == new {
            return false;
        }

        {
            let mut endpoints = self.endpoints.write();
            let Some(slot) = endpoints.iter_mut().find(|e| e.as_str() == old) else {
                return false;
            };
            slot.clone_from(&new);
        }

        debug!(interface = %self.name, old, new = %new, "interface endpoint changed");
        self.fire(&InterfaceEvent::EndpointChanged {
            old: Some(old.to_owned()),
            new: Some(new),
        });
        true
    }

    pub fn add_listener(&self, listener: &Arc<dyn InterfaceListener>) -> ListenerId {
        let id = ListenerId::allocate(&self.next_listener_id);
        self.listeners.write().push((id, Arc::downgrade(listener)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Number of registered listeners that are still alive.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .iter()
            .filter(|(_, listener)| listener.strong_count() > 0)
            .count()
    }

    fn fire(&self, event: &InterfaceEvent) {
        let live: Vec<Arc<dyn InterfaceListener>> = {
            let mut listeners = self.listeners.write();
            listeners.retain(|(_, listener)| listener.strong_count() > 0);
            listeners.iter().filter_map(|(_, l)| l.upgrade()).collect()
        };

        for listener in live {
            listener.interface_changed(event);
        }
    }
}

impl fmt::Debug for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interface")
            .field("name", &self.name)
            .field("soap_version", &self.soap_version)
            .field("endpoints", &*self.endpoints.read())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<InterfaceEvent>>);

    impl InterfaceListener for Recorder {
        fn interface_changed(&self, event: &InterfaceEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn change_endpoint_replaces_and_fires() {
        let interface = Interface::new("QuoteSoap", SoapVersion::Soap11, ["http://a"]);
        let recorder = Arc::new(Recorder::default());
        let listener: Arc<dyn InterfaceListener> = recorder.clone();
        interface.add_listener(&listener);

        assert!(interface.change_endpoint("http://a", "http://b"));
        assert!(!interface.change_endpoint("http://missing", "http://c"));

        assert_eq!(interface.endpoints(), vec!["http://b".to_owned()]);
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![InterfaceEvent::EndpointChanged {
                old: Some("http://a".into()),
                new: Some("http://b".into()),
            }]
        );
    }

    #[test]
    fn dropped_listeners_are_pruned() {
        let interface = Interface::new("QuoteSoap", SoapVersion::Soap11, Vec::<String>::new());
        let listener: Arc<dyn InterfaceListener> = Arc::new(Recorder::default());
        interface.add_listener(&listener);
        assert_eq!(interface.listener_count(), 1);

        drop(listener);
        assert_eq!(interface.listener_count(), 0);
        interface.add_endpoint("http://x");
        assert_eq!(interface.default_endpoint().as_deref(), Some("http://x"));
    }

    #[test]
    fn soap12_content_type_carries_action() {
        assert_eq!(
            SoapVersion::Soap12.content_type("UTF-8", Some("urn:GetQuote")),
            "application/soap+xml;charset=UTF-8;action=\"urn:GetQuote\""
        );
        assert_eq!(
            SoapVersion::Soap11.content_type("UTF-8", Some("urn:GetQuote")),
            "text/xml;charset=UTF-8"
        );
    }
}
