//! Keeps a request's endpoint in step with its interface.

use std::sync::{Arc, Weak};

use tracing::debug;

use super::Request;
use crate::{
    interface::{Interface, InterfaceEvent, InterfaceListener},
    notify::ListenerId,
};

/// Follows endpoint edits made on the interface. Only a request whose
/// endpoint is exactly the changed value is updated.
struct EndpointBridge {
    request: Weak<Request>,
}

impl InterfaceListener for EndpointBridge {
    fn interface_changed(&self, event: &InterfaceEvent) {
        let InterfaceEvent::EndpointChanged { old: Some(old), new } = event else {
            return;
        };

        let Some(request) = self.request.upgrade() else {
            return;
        };

        if request.replace_endpoint_if_matches(old, new.clone()) {
            debug!(request = %request.name(), old = %old, new = ?new, "request endpoint followed interface");
        }
    }
}

/// The interface only holds the bridge weakly; this keeps it alive for as
/// long as the request is registered.
pub(crate) struct BridgeRegistration {
    interface: Arc<Interface>,
    id: ListenerId,
    _bridge: Arc<dyn InterfaceListener>,
}

impl BridgeRegistration {
    pub(crate) fn register(request: &Arc<Request>, interface: Arc<Interface>) -> Self {
        let bridge: Arc<dyn InterfaceListener> = Arc::new(EndpointBridge {
            request: Arc::downgrade(request),
        });
        let id = interface.add_listener(&bridge);

        Self {
            interface,
            id,
            _bridge: bridge,
        }
    }

    pub(crate) fn unregister(self) {
        self.interface.remove_listener(self.id);
    }
}
