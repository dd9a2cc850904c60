//! A single SOAP request bound to an operation.

mod bridge;

use std::{fmt, mem, sync::Arc};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};
use typed_builder::TypedBuilder;

use crate::{
    SubmitError,
    attachments::{self, AttachmentEncoding, AttachmentError, AttachmentPart, AttachmentResolver},
    config::{
        AttachmentConfig, Credentials, DEFAULT_ENCODING, RequestConfig, RequestHeaders, WsaConfig,
        settings,
    },
    diagnostics::{DiagnosticSink, TracingDiagnostics},
    expansion::{PropertyExpansion, SubmitContext, extract_expansions},
    interface::Interface,
    notify::{self, ChangeNotifier, ListenerId, PropertyChangeListener, PropertyValue},
    operation::{Direction, MessagePart, Operation, OperationError},
    response::Response,
    submit::{Submission, SubmissionController, SubmitListener, SubmitMode},
};

use bridge::BridgeRegistration;

const NONE_PASSWORD_TYPE: &str = "None";

#[derive(Debug, Clone, TypedBuilder)]
pub struct RequestOptions {
    /// Load-test requests never follow interface endpoint changes.
    #[builder(default = false)]
    pub load_test: bool,
    #[builder(default = Arc::new(attachments::XmlAttachmentResolver) as Arc<dyn AttachmentResolver>)]
    pub resolver: Arc<dyn AttachmentResolver>,
    #[builder(default = Arc::new(TracingDiagnostics) as Arc<dyn DiagnosticSink>)]
    pub diagnostics: Arc<dyn DiagnosticSink>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, thiserror::Error)]
enum MessagePartsError {
    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    Attachment(#[from] AttachmentError),
}

struct RequestState {
    config: RequestConfig,
    operation: Arc<dyn Operation>,
    /// Cleared whenever the body, the operation or the MTOM flag changes.
    attachment_parts: Option<Arc<[AttachmentPart]>>,
    response: Option<Arc<Response>>,
}

impl RequestState {
    fn mtom_enabled(&self) -> bool {
        self.config.settings.get_bool(settings::ENABLE_MTOM)
    }

    fn credentials_mut(&mut self) -> &mut Credentials {
        self.config.credentials.get_or_insert_with(Credentials::default)
    }
}

/// A request, always shared as `Arc<Request>`.
///
/// Mutators update the state first and notify property change listeners
/// once the lock is released, so a listener reading the request back sees
/// the new value.
pub struct Request {
    state: RwLock<RequestState>,
    notifier: ChangeNotifier,
    submit_listeners: RwLock<Vec<Arc<dyn SubmitListener>>>,
    resolver: Arc<dyn AttachmentResolver>,
    diagnostics: Arc<dyn DiagnosticSink>,
    load_test: bool,
    bridge: Mutex<Option<BridgeRegistration>>,
}

impl Request {
    pub fn new(operation: Arc<dyn Operation>, config: RequestConfig) -> Arc<Self> {
        Self::with_options(operation, config, RequestOptions::default())
    }

    pub fn with_options(
        operation: Arc<dyn Operation>,
        mut config: RequestConfig,
        options: RequestOptions,
    ) -> Arc<Self> {
        if config.encoding.as_deref().is_none_or(str::is_empty) {
            config.encoding = Some(DEFAULT_ENCODING.to_owned());
        }

        if config.endpoint.is_none() {
            config.endpoint = operation.interface().default_endpoint();
        }

        let interface = Arc::clone(operation.interface());
        let request = Arc::new(Self {
            state: RwLock::new(RequestState {
                config,
                operation,
                attachment_parts: None,
                response: None,
            }),
            notifier: ChangeNotifier::default(),
            submit_listeners: RwLock::new(Vec::new()),
            resolver: options.resolver,
            diagnostics: options.diagnostics,
            load_test: options.load_test,
            bridge: Mutex::new(None),
        });

        if !request.load_test {
            *request.bridge.lock() = Some(BridgeRegistration::register(&request, interface));
        }

        debug!(request = %request.name(), load_test = request.load_test, "request created");
        request
    }

    /// Applies `change` under the write lock, then broadcasts the returned
    /// old and new values.
    fn update(
        &self,
        property: &'static str,
        change: impl FnOnce(&mut RequestState) -> (PropertyValue, PropertyValue),
    ) {
        let (old, new) = {
            let mut state = self.state.write();
            change(&mut state)
        };
        self.notifier.notify(property, old, new);
    }

    pub fn name(&self) -> String {
        self.state.read().config.name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.update(notify::NAME, |state| {
            let old = mem::replace(&mut state.config.name, name.clone());
            (old.into(), name.into())
        });
    }

    pub fn operation(&self) -> Arc<dyn Operation> {
        Arc::clone(&self.state.read().operation)
    }

    pub fn interface(&self) -> Arc<Interface> {
        Arc::clone(self.state.read().operation.interface())
    }

    /// Rebinds the request. Moving to an operation of another interface
    /// moves the endpoint listener along with it.
    pub fn set_operation(self: &Arc<Self>, operation: Arc<dyn Operation>) {
        let old = {
            let mut state = self.state.write();
            state.attachment_parts = None;
            mem::replace(&mut state.operation, Arc::clone(&operation))
        };

        if !Arc::ptr_eq(old.interface(), operation.interface()) {
            let mut bridge = self.bridge.lock();
            if let Some(registration) = bridge.take() {
                registration.unregister();
                *bridge = Some(BridgeRegistration::register(
                    self,
                    Arc::clone(operation.interface()),
                ));
            }
        }

        self.notifier.notify(
            notify::OPERATION,
            PropertyValue::Operation(old),
            PropertyValue::Operation(operation),
        );
    }

    pub fn endpoint(&self) -> Option<String> {
        self.state.read().config.endpoint.clone()
    }

    pub fn set_endpoint(&self, endpoint: impl Into<Option<String>>) {
        let endpoint = endpoint.into();
        self.update(notify::ENDPOINT, |state| {
            let old = mem::replace(&mut state.config.endpoint, endpoint.clone());
            (old.into(), endpoint.into())
        });
    }

    /// Compare-and-set used when the interface renames or drops `old`.
    pub(crate) fn replace_endpoint_if_matches(&self, old: &str, new: Option<String>) -> bool {
        let previous = {
            let mut state = self.state.write();
            if state.config.endpoint.as_deref() != Some(old) {
                return false;
            }
            mem::replace(&mut state.config.endpoint, new.clone())
        };

        self.notifier.notify(notify::ENDPOINT, previous.into(), new.into());
        true
    }

    pub fn request_content(&self) -> String {
        self.state.read().config.request_content.clone()
    }

    pub fn set_request_content(&self, content: impl Into<String>) {
        let content = content.into();
        self.update(notify::REQUEST, |state| {
            state.attachment_parts = None;
            let old = mem::replace(&mut state.config.request_content, content.clone());
            (old.into(), content.into())
        });
    }

    /// Size of the request body in bytes.
    pub fn content_length(&self) -> usize {
        self.state.read().config.request_content.len()
    }

    pub fn encoding(&self) -> String {
        self.state
            .read()
            .config
            .encoding
            .clone()
            .unwrap_or_else(|| DEFAULT_ENCODING.to_owned())
    }

    /// An empty encoding resets to UTF-8.
    pub fn set_encoding(&self, encoding: &str) {
        let encoding = if encoding.is_empty() {
            DEFAULT_ENCODING
        } else {
            encoding
        };
        let encoding = Some(encoding.to_owned());
        self.update(notify::ENCODING, |state| {
            let old = mem::replace(&mut state.config.encoding, encoding.clone());
            (old.into(), encoding.into())
        });
    }

    pub fn headers(&self) -> RequestHeaders {
        self.state.read().config.headers.clone()
    }

    pub fn set_headers(&self, headers: RequestHeaders) {
        self.update(notify::HEADERS, |state| {
            let old = mem::replace(&mut state.config.headers, headers.clone());
            (PropertyValue::Headers(old), PropertyValue::Headers(headers))
        });
    }

    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        self.update(notify::HEADERS, |state| {
            let old = state.config.headers.clone();
            state.config.headers.insert(name, value);
            (
                PropertyValue::Headers(old),
                PropertyValue::Headers(state.config.headers.clone()),
            )
        });
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.state.read().config.credentials.clone()
    }

    pub fn set_credentials(&self, credentials: Option<Credentials>) {
        let (old, new) = {
            let mut state = self.state.write();
            let old = mem::replace(&mut state.config.credentials, credentials)
                .unwrap_or_default();
            let new = state.config.credentials.clone().unwrap_or_default();
            (old, new)
        };

        self.notifier
            .notify(notify::USERNAME, old.username.into(), new.username.into());
        self.notifier
            .notify(notify::PASSWORD, old.password.into(), new.password.into());
        self.notifier
            .notify(notify::DOMAIN, old.domain.into(), new.domain.into());
    }

    pub fn username(&self) -> Option<String> {
        self.state
            .read()
            .config
            .credentials
            .as_ref()
            .and_then(|c| c.username.clone())
    }

    pub fn set_username(&self, username: Option<String>) {
        self.update(notify::USERNAME, |state| {
            let old = mem::replace(&mut state.credentials_mut().username, username.clone());
            (old.into(), username.into())
        });
    }

    pub fn password(&self) -> Option<String> {
        self.state
            .read()
            .config
            .credentials
            .as_ref()
            .and_then(|c| c.password.clone())
    }

    pub fn set_password(&self, password: Option<String>) {
        self.update(notify::PASSWORD, |state| {
            let old = mem::replace(&mut state.credentials_mut().password, password.clone());
            (old.into(), password.into())
        });
    }

    pub fn domain(&self) -> Option<String> {
        self.state
            .read()
            .config
            .credentials
            .as_ref()
            .and_then(|c| c.domain.clone())
    }

    pub fn set_domain(&self, domain: Option<String>) {
        self.update(notify::DOMAIN, |state| {
            let old = mem::replace(&mut state.credentials_mut().domain, domain.clone());
            (old.into(), domain.into())
        });
    }

    /// Never returns the `"None"` sentinel.
    pub fn wss_password_type(&self) -> Option<String> {
        self.state
            .read()
            .config
            .wss_password_type
            .clone()
            .filter(|kind| !kind.is_empty() && kind != NONE_PASSWORD_TYPE)
    }

    /// `None`, `""` and `"None"` all clear the password type.
    pub fn set_wss_password_type(&self, password_type: Option<&str>) {
        let password_type = password_type
            .filter(|kind| !kind.is_empty() && *kind != NONE_PASSWORD_TYPE)
            .map(ToOwned::to_owned);
        self.update(notify::WSS_PASSWORD_TYPE, |state| {
            let old = mem::replace(&mut state.config.wss_password_type, password_type.clone())
                .filter(|kind| !kind.is_empty() && kind != NONE_PASSWORD_TYPE);
            (old.into(), password_type.into())
        });
    }

    pub fn incoming_wss(&self) -> Option<String> {
        self.state.read().config.incoming_wss.clone()
    }

    pub fn set_incoming_wss(&self, incoming: Option<String>) {
        self.update(notify::INCOMING_WSS, |state| {
            let old = mem::replace(&mut state.config.incoming_wss, incoming.clone());
            (old.into(), incoming.into())
        });
    }

    pub fn outgoing_wss(&self) -> Option<String> {
        self.state.read().config.outgoing_wss.clone()
    }

    pub fn set_outgoing_wss(&self, outgoing: Option<String>) {
        self.update(notify::OUTGOING_WSS, |state| {
            let old = mem::replace(&mut state.config.outgoing_wss, outgoing.clone());
            (old.into(), outgoing.into())
        });
    }

    pub fn wss_time_to_live(&self) -> Option<String> {
        self.state
            .read()
            .config
            .settings
            .get_string(settings::WSS_TIME_TO_LIVE)
            .map(ToOwned::to_owned)
    }

    pub fn set_wss_time_to_live(&self, time_to_live: Option<String>) {
        self.update(settings::WSS_TIME_TO_LIVE, |state| {
            let old = state
                .config
                .settings
                .get_string(settings::WSS_TIME_TO_LIVE)
                .map(ToOwned::to_owned);
            state
                .config
                .settings
                .set_string(settings::WSS_TIME_TO_LIVE, time_to_live.clone());
            (old.into(), time_to_live.into())
        });
    }

    pub fn ws_addressing(&self) -> bool {
        self.state.read().config.use_ws_addressing
    }

    pub fn set_ws_addressing(&self, enabled: bool) {
        self.update(notify::WS_ADDRESSING, |state| {
            let old = mem::replace(&mut state.config.use_ws_addressing, enabled);
            (old.into(), enabled.into())
        });
    }

    /// Creates (and stores) a default configuration on first access.
    pub fn wsa_config(&self) -> WsaConfig {
        if let Some(config) = self.state.read().config.wsa_config.clone() {
            return config;
        }

        self.state
            .write()
            .config
            .wsa_config
            .get_or_insert_with(WsaConfig::default)
            .clone()
    }

    pub fn set_wsa_config(&self, config: WsaConfig) {
        self.state.write().config.wsa_config = Some(config);
    }

    fn setting(&self, key: &str) -> bool {
        self.state.read().config.settings.get_bool(key)
    }

    fn set_setting(&self, key: &'static str, value: bool) {
        self.update(key, |state| {
            let old = state.config.settings.get_bool(key);
            state.config.settings.set_bool(key, value);
            (old.into(), value.into())
        });
    }

    pub fn mtom_enabled(&self) -> bool {
        self.setting(settings::ENABLE_MTOM)
    }

    /// Attachment parts depend on the MTOM flag, so this drops the cached ones.
    pub fn set_mtom_enabled(&self, enabled: bool) {
        self.update(settings::ENABLE_MTOM, |state| {
            let old = state.mtom_enabled();
            state.config.settings.set_bool(settings::ENABLE_MTOM, enabled);
            state.attachment_parts = None;
            (old.into(), enabled.into())
        });
    }

    pub fn force_mtom(&self) -> bool {
        self.setting(settings::FORCE_MTOM)
    }

    pub fn set_force_mtom(&self, force: bool) {
        self.set_setting(settings::FORCE_MTOM, force);
    }

    pub fn encode_attachments(&self) -> bool {
        self.setting(settings::ENCODE_ATTACHMENTS)
    }

    pub fn set_encode_attachments(&self, encode: bool) {
        self.set_setting(settings::ENCODE_ATTACHMENTS, encode);
    }

    pub fn inline_response_attachments(&self) -> bool {
        self.setting(settings::INLINE_RESPONSE_ATTACHMENTS)
    }

    pub fn set_inline_response_attachments(&self, inline: bool) {
        self.set_setting(settings::INLINE_RESPONSE_ATTACHMENTS, inline);
    }

    pub fn expand_mtom_response_attachments(&self) -> bool {
        self.setting(settings::EXPAND_MTOM_RESPONSE_ATTACHMENTS)
    }

    pub fn set_expand_mtom_response_attachments(&self, expand: bool) {
        self.set_setting(settings::EXPAND_MTOM_RESPONSE_ATTACHMENTS, expand);
    }

    pub fn inline_files_enabled(&self) -> bool {
        self.setting(settings::ENABLE_INLINE_FILES)
    }

    pub fn set_inline_files_enabled(&self, enabled: bool) {
        self.set_setting(settings::ENABLE_INLINE_FILES, enabled);
    }

    pub fn skip_soap_action(&self) -> bool {
        self.setting(settings::SKIP_SOAP_ACTION)
    }

    pub fn set_skip_soap_action(&self, skip: bool) {
        self.set_setting(settings::SKIP_SOAP_ACTION, skip);
    }

    pub fn attachments(&self) -> Vec<AttachmentConfig> {
        self.state.read().config.attachments.clone()
    }

    pub fn add_attachment(&self, attachment: AttachmentConfig) {
        self.update(notify::ATTACHMENTS, |state| {
            let old = state.config.attachments.len();
            state.config.attachments.push(attachment);
            (
                PropertyValue::Count(old),
                PropertyValue::Count(state.config.attachments.len()),
            )
        });
    }

    pub fn remove_attachment(&self, index: usize) -> Option<AttachmentConfig> {
        let (removed, old, new) = {
            let mut state = self.state.write();
            let old = state.config.attachments.len();
            if index >= old {
                return None;
            }
            let removed = state.config.attachments.remove(index);
            (removed, old, state.config.attachments.len())
        };

        self.notifier.notify(
            notify::ATTACHMENTS,
            PropertyValue::Count(old),
            PropertyValue::Count(new),
        );
        Some(removed)
    }

    pub fn set_attachments(&self, attachments: Vec<AttachmentConfig>) {
        self.update(notify::ATTACHMENTS, |state| {
            let old = mem::replace(&mut state.config.attachments, attachments);
            (
                PropertyValue::Count(old.len()),
                PropertyValue::Count(state.config.attachments.len()),
            )
        });
    }

    /// Attachment parts of the request message, resolved once and then
    /// served from cache until the body, operation or MTOM flag changes.
    /// A failed resolution is logged and cached as an empty list.
    pub fn defined_attachment_parts(&self) -> Arc<[AttachmentPart]> {
        if let Some(parts) = self.state.read().attachment_parts.clone() {
            return parts;
        }

        let mut state = self.state.write();
        if let Some(parts) = &state.attachment_parts {
            return Arc::clone(parts);
        }

        let parts: Arc<[AttachmentPart]> = match self.resolver.extract(
            state.operation.as_ref(),
            &state.config.request_content,
            true,
            false,
            state.mtom_enabled(),
        ) {
            Ok(parts) => parts.into(),
            Err(error) => {
                warn!(request = %state.config.name, %error, "failed to resolve attachment parts");
                Vec::<AttachmentPart>::new().into()
            }
        };

        state.attachment_parts = Some(Arc::clone(&parts));
        parts
    }

    pub fn attachment_part(&self, name: &str) -> Option<AttachmentPart> {
        self.defined_attachment_parts()
            .iter()
            .find(|part| part.name == name)
            .cloned()
    }

    pub fn attachment_encoding(&self, part_name: &str) -> AttachmentEncoding {
        attachments::attachment_encoding(self.operation().as_ref(), part_name, Direction::Request)
    }

    /// Operation request parts followed by the attachment parts. Empty on failure.
    pub fn request_parts(&self) -> Vec<MessagePart> {
        match self.operation().default_request_parts() {
            Ok(mut parts) => {
                parts.extend(
                    self.defined_attachment_parts()
                        .iter()
                        .cloned()
                        .map(MessagePart::Attachment),
                );
                parts
            }
            Err(error) => {
                self.diagnostics.log_error(&error);
                Vec::new()
            }
        }
    }

    /// Operation response parts followed by the attachment parts found in
    /// the last response, if there is one. Not cached. Empty on failure.
    pub fn response_parts(&self) -> Vec<MessagePart> {
        self.collect_response_parts().unwrap_or_else(|error| {
            self.diagnostics.log_error(&error);
            Vec::new()
        })
    }

    fn collect_response_parts(&self) -> Result<Vec<MessagePart>, MessagePartsError> {
        let (operation, content, mtom) = {
            let state = self.state.read();
            (
                Arc::clone(&state.operation),
                state
                    .response
                    .as_ref()
                    .map(|response| response.content.clone()),
                state.mtom_enabled(),
            )
        };

        let mut parts = operation.default_response_parts()?;
        let Some(content) = content else {
            return Ok(parts);
        };
        let attachments = self
            .resolver
            .extract(operation.as_ref(), &content, false, true, mtom)?;
        parts.extend(attachments.into_iter().map(MessagePart::Attachment));
        Ok(parts)
    }

    pub fn response(&self) -> Option<Arc<Response>> {
        self.state.read().response.clone()
    }

    #[deprecated(note = "use `response()` and read its content")]
    pub fn response_content(&self) -> Option<String> {
        self.state
            .read()
            .response
            .as_ref()
            .map(|response| response.content.clone())
    }

    pub(crate) fn set_response(&self, response: Option<Arc<Response>>) {
        self.update(notify::RESPONSE, |state| {
            let old = mem::replace(&mut state.response, response.clone());
            (PropertyValue::Response(old), PropertyValue::Response(response))
        });
    }

    /// Snapshot of the persisted configuration.
    pub fn config(&self) -> RequestConfig {
        self.state.read().config.clone()
    }

    /// Copies the request setup onto `target`. Attachments and headers are
    /// only copied when asked for; credentials only when this request has any.
    pub fn copy_to(&self, target: &Self, copy_attachments: bool, copy_headers: bool) {
        let source = self.config();

        target.set_encoding(source.encoding.as_deref().unwrap_or(DEFAULT_ENCODING));
        target.set_endpoint(source.endpoint);
        target.set_request_content(source.request_content);
        target.set_wss_password_type(source.wss_password_type.as_deref());

        if let Some(credentials) = source.credentials {
            target.set_credentials(Some(credentials));
        }

        if copy_attachments {
            target.set_attachments(source.attachments);
        }

        if copy_headers {
            target.set_headers(source.headers);
        }
    }

    /// Every `${...}` reference in the endpoint, the body and the header values.
    pub fn property_expansions(&self) -> Vec<PropertyExpansion> {
        let state = self.state.read();
        let config = &state.config;

        let mut expansions = Vec::new();
        if let Some(endpoint) = &config.endpoint {
            expansions.extend(extract_expansions(notify::ENDPOINT, endpoint));
        }
        expansions.extend(extract_expansions(notify::REQUEST, &config.request_content));
        for (name, value) in config.headers.iter() {
            expansions.extend(extract_expansions(name, value));
        }
        expansions
    }

    pub fn add_property_change_listener(
        &self,
        listener: Arc<dyn PropertyChangeListener>,
    ) -> ListenerId {
        self.notifier.add_listener(listener)
    }

    pub fn remove_property_change_listener(&self, id: ListenerId) -> bool {
        self.notifier.remove_listener(id)
    }

    pub fn add_submit_listener(&self, listener: Arc<dyn SubmitListener>) {
        self.submit_listeners.write().push(listener);
    }

    pub fn submit_listeners(&self) -> Vec<Arc<dyn SubmitListener>> {
        self.submit_listeners.read().clone()
    }

    pub fn is_load_test(&self) -> bool {
        self.load_test
    }

    /// Whether the request currently listens to its interface.
    pub fn is_registered(&self) -> bool {
        self.bridge.lock().is_some()
    }

    /// Stops following the interface. Safe to call any number of times.
    pub fn release(&self) {
        let registration = self.bridge.lock().take();
        if let Some(registration) = registration {
            registration.unregister();
            debug!("request released from interface");
        }
    }

    pub fn submit(
        self: &Arc<Self>,
        controller: &SubmissionController,
        context: &SubmitContext,
        mode: SubmitMode,
    ) -> Result<Option<Submission>, SubmitError> {
        controller.submit(self, context, mode)
    }
}

impl Drop for Request {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Request")
            .field("name", &state.config.name)
            .field("operation", &state.operation.name())
            .field("endpoint", &state.config.endpoint)
            .field("load_test", &self.load_test)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::{
        interface::SoapVersion,
        notify::PropertyChange,
        operation::{AttachmentDefinition, ContentPart, WsdlOperation},
    };

    fn operation(interface: &Arc<Interface>) -> Arc<dyn Operation> {
        Arc::new(
            WsdlOperation::builder()
                .name("GetQuote")
                .interface(Arc::clone(interface))
                .action("urn:GetQuote")
                .request_parts(vec![MessagePart::Content(ContentPart::new("symbol"))])
                .response_parts(vec![MessagePart::Content(ContentPart::new("price"))])
                .build(),
        )
    }

    fn request() -> Arc<Request> {
        let interface = Interface::new("QuoteSoap", SoapVersion::Soap11, ["http://a/quote"]);
        Request::new(
            operation(&interface),
            RequestConfig {
                name: "GetQuote 1".into(),
                ..RequestConfig::default()
            },
        )
    }

    fn record(request: &Request) -> Arc<StdMutex<Vec<PropertyChange>>> {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        request.add_property_change_listener(Arc::new(move |change: &PropertyChange| {
            sink.lock().unwrap().push(change.clone());
        }));
        seen
    }

    #[test]
    fn construction_fills_encoding_and_endpoint() {
        let request = request();
        assert_eq!(request.encoding(), "UTF-8");
        assert_eq!(request.endpoint().as_deref(), Some("http://a/quote"));
        assert!(request.is_registered());
    }

    #[test]
    fn empty_encoding_resets_to_default() {
        let request = request();
        request.set_encoding("ISO-8859-1");
        assert_eq!(request.encoding(), "ISO-8859-1");
        request.set_encoding("");
        assert_eq!(request.encoding(), "UTF-8");
    }

    #[test]
    fn wss_password_type_hides_sentinel() {
        let request = request();
        request.set_wss_password_type(Some("PasswordDigest"));
        assert_eq!(request.wss_password_type().as_deref(), Some("PasswordDigest"));

        request.set_wss_password_type(Some("None"));
        assert_eq!(request.wss_password_type(), None);

        request.set_wss_password_type(Some("PasswordText"));
        request.set_wss_password_type(None);
        assert_eq!(request.wss_password_type(), None);
        assert_eq!(request.config().wss_password_type, None);
    }

    #[test]
    fn setters_notify_only_on_change() {
        let request = request();
        let seen = record(&request);

        request.set_force_mtom(true);
        request.set_force_mtom(true);
        request.set_endpoint("http://b/quote".to_owned());

        let seen = seen.lock().unwrap();
        let names: Vec<_> = seen.iter().map(|c| c.name).collect();
        assert_eq!(names, vec![settings::FORCE_MTOM, notify::ENDPOINT]);
        assert_eq!(seen[1].old, PropertyValue::Text(Some("http://a/quote".into())));
    }

    #[test]
    fn operation_and_mtom_changes_are_broadcast() {
        let request = request();
        let seen = record(&request);
        let before = request.operation();
        let after = operation(&request.interface());

        request.set_operation(Arc::clone(&after));
        request.set_mtom_enabled(true);
        request.set_mtom_enabled(true);

        let seen = seen.lock().unwrap();
        let names: Vec<_> = seen.iter().map(|c| c.name).collect();
        assert_eq!(names, vec![notify::OPERATION, settings::ENABLE_MTOM]);
        assert_eq!(seen[0].old, PropertyValue::Operation(before));
        assert_eq!(seen[0].new, PropertyValue::Operation(after));
        assert_eq!(seen[1].old, PropertyValue::Bool(false));
        assert_eq!(seen[1].new, PropertyValue::Bool(true));
    }

    #[test]
    fn response_parts_skip_attachments_until_a_response_arrives() {
        let interface = Interface::new("QuoteSoap", SoapVersion::Soap11, ["http://a/quote"]);
        let operation: Arc<dyn Operation> = Arc::new(
            WsdlOperation::builder()
                .name("GetQuote")
                .interface(interface)
                .response_parts(vec![MessagePart::Content(ContentPart::new("price"))])
                .response_attachments(vec![AttachmentDefinition::new(
                    "receipt",
                    ["application/pdf"],
                )])
                .build(),
        );
        let request = Request::new(operation, RequestConfig::default());

        let names: Vec<_> = request
            .response_parts()
            .iter()
            .map(|p| p.name().to_owned())
            .collect();
        assert_eq!(names, vec!["price"]);

        request.set_response(Some(Arc::new(Response::default())));
        let names: Vec<_> = request
            .response_parts()
            .iter()
            .map(|p| p.name().to_owned())
            .collect();
        assert_eq!(names, vec!["price", "receipt"]);
    }

    #[test]
    fn listener_sees_new_value() {
        let request = request();
        let observed = Arc::new(StdMutex::new(None));
        let (sink, weak) = (Arc::clone(&observed), Arc::downgrade(&request));
        request.add_property_change_listener(Arc::new(move |_: &PropertyChange| {
            if let Some(request) = weak.upgrade() {
                *sink.lock().unwrap() = Some(request.request_content());
            }
        }));

        request.set_request_content("<x/>");
        assert_eq!(observed.lock().unwrap().as_deref(), Some("<x/>"));
    }

    #[test]
    fn credential_accessors_share_one_record() {
        let request = request();
        assert!(request.credentials().is_none());

        request.set_username(Some("admin".into()));
        request.set_password(Some("secret".into()));
        request.set_domain(Some("CORP".into()));

        let credentials = request.credentials().unwrap();
        assert_eq!(credentials.username.as_deref(), Some("admin"));
        assert_eq!(credentials.password.as_deref(), Some("secret"));
        assert_eq!(request.domain().as_deref(), Some("CORP"));
    }

    #[test]
    fn wsa_config_is_created_once() {
        let request = request();
        assert!(request.config().wsa_config.is_none());

        let mut config = request.wsa_config();
        assert!(request.config().wsa_config.is_some());

        config.action = Some("urn:GetQuote".into());
        request.set_wsa_config(config);
        assert_eq!(request.wsa_config().action.as_deref(), Some("urn:GetQuote"));
    }

    #[test]
    fn attachments_can_be_added_and_removed() {
        let request = request();
        request.add_attachment(AttachmentConfig {
            name: "scan.png".into(),
            content_type: "image/png".into(),
            ..AttachmentConfig::default()
        });
        assert_eq!(request.attachments().len(), 1);
        assert!(request.remove_attachment(3).is_none());
        assert_eq!(request.remove_attachment(0).unwrap().name, "scan.png");
        assert!(request.attachments().is_empty());
    }

    #[test]
    fn parts_combine_operation_and_attachments() {
        let request = request();
        request.set_request_content(
            r#"<q:GetQuote xmlns:q="urn:q"><q:Chart>cid:chart</q:Chart></q:GetQuote>"#,
        );

        let names: Vec<_> = request
            .request_parts()
            .iter()
            .map(|p| p.name().to_owned())
            .collect();
        assert_eq!(names, vec!["symbol", "chart"]);

        let names: Vec<_> = request
            .response_parts()
            .iter()
            .map(|p| p.name().to_owned())
            .collect();
        assert_eq!(names, vec!["price"]);
    }

    #[test]
    fn content_length_counts_bytes() {
        let request = request();
        request.set_request_content("é");
        assert_eq!(request.content_length(), 2);
    }

    #[test]
    fn lists_property_expansions() {
        let request = request();
        request.set_endpoint("${host}/quote".to_owned());
        request.set_request_content("<s>${symbol}</s>");
        request.set_header("X-Token", "${#Project#token}");

        let containers: Vec<_> = request
            .property_expansions()
            .into_iter()
            .map(|e| (e.container, e.expression))
            .collect();
        assert_eq!(
            containers,
            vec![
                ("endpoint".to_owned(), "host".to_owned()),
                ("request".to_owned(), "symbol".to_owned()),
                ("X-Token".to_owned(), "#Project#token".to_owned()),
            ]
        );
    }
}
