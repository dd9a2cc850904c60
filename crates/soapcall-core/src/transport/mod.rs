//! Scheme-keyed transport selection and the message handed to a transport.

pub mod http;

use std::{collections::HashMap, fmt, sync::Arc};

use tracing::debug;
use url::Url;

use crate::{
    config::{AttachmentConfig, WsaConfig, WssPasswordType},
    expansion::SubmitContext,
    interface::SoapVersion,
    submit::{Submission, SubmitMode},
};

pub use http::{HttpBuilder, HttpRequest, Method};

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("No transport registered for scheme [{scheme}]")]
    NotFound { scheme: String },

    #[error("Invalid endpoint [{endpoint}]: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Other(String),
}

/// Attachment handling switches of the request being sent.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttachmentPolicy {
    pub mtom: bool,
    pub force_mtom: bool,
    pub encode_attachments: bool,
    pub inline_response_attachments: bool,
    pub expand_mtom_response_attachments: bool,
    pub inline_files: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WssSettings {
    pub password_type: Option<WssPasswordType>,
    pub incoming: Option<String>,
    pub outgoing: Option<String>,
    pub time_to_live: Option<String>,
}

/// A request with every property reference expanded, ready for the wire.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub request_name: String,
    pub http: HttpRequest,
    pub encoding: String,
    pub soap_version: SoapVersion,
    pub attachments: Vec<AttachmentConfig>,
    pub policy: AttachmentPolicy,
    pub wss: WssSettings,
    pub wsa: Option<WsaConfig>,
}

/// Performs the exchange for one prepared request.
///
/// `Err` is reserved for failures before anything was sent. Once the
/// exchange has started, failures are reported through the returned
/// [`Submission`].
pub trait Transport: Send + Sync + fmt::Debug {
    fn exchange(
        &self,
        request: PreparedRequest,
        context: &SubmitContext,
        mode: SubmitMode,
    ) -> Result<Submission, TransportError>;
}

#[derive(Debug, Clone, Default)]
pub struct TransportRegistry {
    transports: HashMap<String, Arc<dyn Transport>>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the transport previously registered for `scheme`, if any.
    pub fn register(
        &mut self,
        scheme: &str,
        transport: Arc<dyn Transport>,
    ) -> Option<Arc<dyn Transport>> {
        self.transports.insert(scheme.to_ascii_lowercase(), transport)
    }

    #[must_use]
    pub fn with(mut self, scheme: &str, transport: Arc<dyn Transport>) -> Self {
        self.register(scheme, transport);
        self
    }

    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<_> = self.transports.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    pub fn resolve(
        &self,
        endpoint: &Url,
        _context: &SubmitContext,
    ) -> Result<Arc<dyn Transport>, TransportError> {
        debug!(endpoint = %endpoint, scheme = endpoint.scheme(), "resolving transport");
        self.transports
            .get(endpoint.scheme())
            .cloned()
            .ok_or_else(|| TransportError::NotFound {
                scheme: endpoint.scheme().to_owned(),
            })
    }
}
