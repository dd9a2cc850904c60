//! Attachment parts referenced by or declared for a message.

mod resolver;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::operation::{AttachmentDefinition, Direction, Operation};

pub use resolver::XmlAttachmentResolver;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttachmentEncoding {
    #[default]
    None,
    Base64,
    Hex,
}

impl AttachmentEncoding {
    /// Maps an XML schema type (`xs:base64Binary`, `hexBinary`, ...) to the
    /// encoding its inline content uses.
    pub fn from_schema_type(type_name: &str) -> Self {
        let local = type_name.rsplit(':').next().unwrap_or(type_name);
        match local {
            "base64Binary" => Self::Base64,
            "hexBinary" => Self::Hex,
            _ => Self::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    /// Declared by the operation's MIME binding.
    Mime,
    /// Referenced from the body with a `cid:` URI.
    Content,
    /// MTOM/XOP optimized content.
    Xop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPart {
    pub name: String,
    pub content_type: String,
    pub encoding: AttachmentEncoding,
    pub kind: AttachmentKind,
}

impl From<&AttachmentDefinition> for AttachmentPart {
    fn from(definition: &AttachmentDefinition) -> Self {
        let content_type = if definition.content_types.is_empty() {
            DEFAULT_CONTENT_TYPE.to_owned()
        } else {
            definition.content_types.join(",")
        };

        Self {
            name: definition.name.clone(),
            content_type,
            encoding: definition.encoding,
            kind: AttachmentKind::Mime,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("Failed to parse message body: {0}")]
    Xml(#[from] soapcall_xml::XmlError),
}

/// Extracts the attachment parts of a message.
///
/// Implementations must be deterministic: identical inputs give identical
/// output, which is what lets a request cache the result.
pub trait AttachmentResolver: Send + Sync + fmt::Debug {
    fn extract(
        &self,
        operation: &dyn Operation,
        body: &str,
        include_request: bool,
        include_response: bool,
        mtom: bool,
    ) -> Result<Vec<AttachmentPart>, AttachmentError>;
}

/// Encoding declared by the operation for `part_name`, `None` when the part is unknown.
pub fn attachment_encoding(
    operation: &dyn Operation,
    part_name: &str,
    direction: Direction,
) -> AttachmentEncoding {
    operation
        .attachment_definitions(direction)
        .iter()
        .find(|definition| definition.name == part_name)
        .map_or(AttachmentEncoding::None, |definition| definition.encoding)
}
