//! In-process property change notifications.

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use parking_lot::RwLock;
use tracing::error;

use crate::{config::RequestHeaders, operation::Operation, response::Response};

pub const NAME: &str = "name";
pub const ENDPOINT: &str = "endpoint";
pub const REQUEST: &str = "request";
pub const ENCODING: &str = "encoding";
pub const HEADERS: &str = "requestHeaders";
pub const OPERATION: &str = "operation";
pub const RESPONSE: &str = "response";
pub const USERNAME: &str = "username";
pub const PASSWORD: &str = "password";
pub const DOMAIN: &str = "domain";
pub const WSS_PASSWORD_TYPE: &str = "wssPasswordType";
pub const INCOMING_WSS: &str = "incomingWss";
pub const OUTGOING_WSS: &str = "outgoingWss";
pub const WS_ADDRESSING: &str = "wsAddressing";
pub const ATTACHMENTS: &str = "attachments";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn allocate(counter: &AtomicU64) -> Self {
        Self(counter.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone)]
pub enum PropertyValue {
    Bool(bool),
    Text(Option<String>),
    Count(usize),
    Headers(RequestHeaders),
    Operation(Arc<dyn Operation>),
    Response(Option<Arc<Response>>),
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Count(a), Self::Count(b)) => a == b,
            (Self::Headers(a), Self::Headers(b)) => a == b,
            (Self::Operation(a), Self::Operation(b)) => Arc::ptr_eq(a, b),
            (Self::Response(Some(a)), Self::Response(Some(b))) => Arc::ptr_eq(a, b),
            (Self::Response(None), Self::Response(None)) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "Bool({v})"),
            Self::Text(v) => write!(f, "Text({v:?})"),
            Self::Count(v) => write!(f, "Count({v})"),
            Self::Headers(v) => write!(f, "Headers({v:?})"),
            Self::Operation(op) => write!(f, "Operation({})", op.name()),
            Self::Response(r) => write!(f, "Response({:?})", r.as_ref().map(|r| r.status_code)),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Option<String>> for PropertyValue {
    fn from(value: Option<String>) -> Self {
        Self::Text(value)
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(Some(value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
    pub name: &'static str,
    pub old: PropertyValue,
    pub new: PropertyValue,
}

pub trait PropertyChangeListener: Send + Sync {
    fn property_changed(&self, change: &PropertyChange);
}

impl<F> PropertyChangeListener for F
where
    F: Fn(&PropertyChange) + Send + Sync,
{
    fn property_changed(&self, change: &PropertyChange) {
        self(change);
    }
}

/// Observer list of a single model object.
#[derive(Default)]
pub struct ChangeNotifier {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn PropertyChangeListener>)>>,
    next_id: AtomicU64,
}

impl ChangeNotifier {
    pub fn add_listener(&self, listener: Arc<dyn PropertyChangeListener>) -> ListenerId {
        let id = ListenerId::allocate(&self.next_id);
        self.listeners.write().push((id, listener));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Broadcasts a change. Nothing is sent when `old == new`, and a panicking
    /// listener is logged instead of unwinding into the caller.
    pub fn notify(&self, name: &'static str, old: PropertyValue, new: PropertyValue) {
        if old == new {
            return;
        }

        let listeners: Vec<_> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        if listeners.is_empty() {
            return;
        }

        let change = PropertyChange { name, old, new };
        for listener in listeners {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener.property_changed(&change)));
            if outcome.is_err() {
                error!(property = name, "property change listener panicked");
            }
        }
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listeners.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<PropertyChange>>>, Arc<dyn PropertyChangeListener>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener = move |change: &PropertyChange| sink.lock().unwrap().push(change.clone());
        (seen, Arc::new(listener))
    }

    #[test]
    fn equal_values_are_not_broadcast() {
        let notifier = ChangeNotifier::default();
        let (seen, listener) = recorder();
        notifier.add_listener(listener);

        notifier.notify(ENDPOINT, Some("a".to_owned()).into(), Some("a".to_owned()).into());
        notifier.notify(ENDPOINT, Some("a".to_owned()).into(), Some("b".to_owned()).into());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].new, PropertyValue::Text(Some("b".into())));
    }

    #[test]
    fn removed_listener_stops_receiving() {
        let notifier = ChangeNotifier::default();
        let (seen, listener) = recorder();
        let id = notifier.add_listener(listener);

        assert!(notifier.remove_listener(id));
        assert!(!notifier.remove_listener(id));
        notifier.notify(NAME, false.into(), true.into());

        assert!(seen.lock().unwrap().is_empty());
    }

    struct Panics;

    impl PropertyChangeListener for Panics {
        fn property_changed(&self, _change: &PropertyChange) {
            panic!("observer bug");
        }
    }

    #[test]
    fn panicking_listener_does_not_reach_the_caller() {
        let notifier = ChangeNotifier::default();
        notifier.add_listener(Arc::new(Panics));
        let (seen, listener) = recorder();
        notifier.add_listener(listener);

        notifier.notify(NAME, false.into(), true.into());

        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
