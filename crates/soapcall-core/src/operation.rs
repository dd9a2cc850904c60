use std::{fmt, sync::Arc};

use typed_builder::TypedBuilder;

use crate::{
    attachments::{AttachmentEncoding, AttachmentPart},
    interface::Interface,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Request,
    Response,
}

/// A non-attachment message part (SOAP body or header part).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPart {
    pub name: String,
    /// Qualified schema element or type of the part, when known.
    pub schema_type: Option<String>,
}

impl ContentPart {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema_type: None,
        }
    }

    #[must_use]
    pub fn with_schema_type(mut self, schema_type: impl Into<String>) -> Self {
        self.schema_type = Some(schema_type.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePart {
    Content(ContentPart),
    Header(ContentPart),
    Attachment(AttachmentPart),
}

impl MessagePart {
    pub fn name(&self) -> &str {
        match self {
            Self::Content(part) | Self::Header(part) => &part.name,
            Self::Attachment(part) => &part.name,
        }
    }
}

/// MIME part declared by the operation binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentDefinition {
    pub name: String,
    pub content_types: Vec<String>,
    pub encoding: AttachmentEncoding,
}

impl AttachmentDefinition {
    pub fn new<I, S>(name: impl Into<String>, content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            content_types: content_types.into_iter().map(Into::into).collect(),
            encoding: AttachmentEncoding::None,
        }
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: AttachmentEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("Failed to read message parts of operation [{operation}]: {reason}")]
    Parts { operation: String, reason: String },
}

/// Operation descriptor a request is bound to.
pub trait Operation: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn interface(&self) -> &Arc<Interface>;

    fn action(&self) -> Option<&str>;

    fn default_request_parts(&self) -> Result<Vec<MessagePart>, OperationError>;

    fn default_response_parts(&self) -> Result<Vec<MessagePart>, OperationError>;

    fn attachment_definitions(&self, direction: Direction) -> &[AttachmentDefinition];
}

/// Operation described by a WSDL binding, with its parts known up front.
#[derive(Debug, TypedBuilder)]
pub struct WsdlOperation {
    #[builder(setter(into))]
    name: String,
    interface: Arc<Interface>,
    #[builder(default, setter(strip_option, into))]
    action: Option<String>,
    #[builder(default)]
    request_parts: Vec<MessagePart>,
    #[builder(default)]
    response_parts: Vec<MessagePart>,
    #[builder(default)]
    request_attachments: Vec<AttachmentDefinition>,
    #[builder(default)]
    response_attachments: Vec<AttachmentDefinition>,
}

impl Operation for WsdlOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn interface(&self) -> &Arc<Interface> {
        &self.interface
    }

    fn action(&self) -> Option<&str> {
        self.action.as_deref().filter(|action| !action.is_empty())
    }

    fn default_request_parts(&self) -> Result<Vec<MessagePart>, OperationError> {
        Ok(self.request_parts.clone())
    }

    fn default_response_parts(&self) -> Result<Vec<MessagePart>, OperationError> {
        Ok(self.response_parts.clone())
    }

    fn attachment_definitions(&self, direction: Direction) -> &[AttachmentDefinition] {
        match direction {
            Direction::Request => &self.request_attachments,
            Direction::Response => &self.response_attachments,
        }
    }
}
