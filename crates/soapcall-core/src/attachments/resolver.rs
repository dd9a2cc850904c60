use std::collections::HashSet;

use soapcall_xml::{
    namespace,
    parser::{self, Node},
};
use tracing::trace;

use super::{
    AttachmentEncoding, AttachmentError, AttachmentKind, AttachmentPart, AttachmentResolver,
    DEFAULT_CONTENT_TYPE,
};
use crate::operation::{Direction, Operation};

/// Resolves parts from the operation's MIME binding plus the `cid:`
/// references and `xop:Include` elements found in the body.
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlAttachmentResolver;

impl AttachmentResolver for XmlAttachmentResolver {
    fn extract(
        &self,
        operation: &dyn Operation,
        body: &str,
        include_request: bool,
        include_response: bool,
        mtom: bool,
    ) -> Result<Vec<AttachmentPart>, AttachmentError> {
        let mut parts = PartList::default();

        if include_request {
            for definition in operation.attachment_definitions(Direction::Request) {
                parts.push(definition.into());
            }
        }

        if include_response {
            for definition in operation.attachment_definitions(Direction::Response) {
                parts.push(definition.into());
            }
        }

        if body.trim().is_empty() {
            return Ok(parts.into_inner());
        }

        let document = parser::parse(body)?;
        let scope = parser::soap_body(&document).unwrap_or_else(|| document.root_element());

        for node in scope.descendants().filter(Node::is_element) {
            if is_xop_include(node) {
                if let Some(id) = parser::attribute_local(node, "href").and_then(content_id) {
                    parts.push(AttachmentPart {
                        name: id.to_owned(),
                        content_type: declared_content_type(node.parent_element()),
                        encoding: AttachmentEncoding::None,
                        kind: AttachmentKind::Xop,
                    });
                }
                continue;
            }

            let text = parser::direct_text(node);
            if let Some(id) = content_id(&text) {
                let (kind, encoding) = if mtom {
                    (AttachmentKind::Xop, AttachmentEncoding::None)
                } else {
                    let encoding = node
                        .attribute((namespace::XSI, "type"))
                        .map_or(AttachmentEncoding::None, AttachmentEncoding::from_schema_type);
                    (AttachmentKind::Content, encoding)
                };

                parts.push(AttachmentPart {
                    name: id.to_owned(),
                    content_type: declared_content_type(Some(node)),
                    encoding,
                    kind,
                });
            }

            // swaRef style: <part href="cid:..."/>
            if let Some(id) = parser::attribute_local(node, "href").and_then(content_id) {
                parts.push(AttachmentPart {
                    name: id.to_owned(),
                    content_type: declared_content_type(Some(node)),
                    encoding: AttachmentEncoding::None,
                    kind: AttachmentKind::Content,
                });
            }
        }

        trace!(operation = operation.name(), count = parts.len(), "extracted attachment parts");
        Ok(parts.into_inner())
    }
}

/// Keeps the first part seen for a given name.
#[derive(Default)]
struct PartList {
    parts: Vec<AttachmentPart>,
    names: HashSet<String>,
}

impl PartList {
    fn push(&mut self, part: AttachmentPart) {
        if self.names.insert(part.name.clone()) {
            self.parts.push(part);
        }
    }

    fn len(&self) -> usize {
        self.parts.len()
    }

    fn into_inner(self) -> Vec<AttachmentPart> {
        self.parts
    }
}

fn content_id(value: &str) -> Option<&str> {
    value
        .trim()
        .strip_prefix("cid:")
        .filter(|id| !id.is_empty())
}

fn is_xop_include(node: Node<'_, '_>) -> bool {
    node.tag_name().name() == "Include" && node.tag_name().namespace() == Some(namespace::XOP)
}

fn declared_content_type(node: Option<Node<'_, '_>>) -> String {
    node.and_then(|node| {
        node.attribute((namespace::XMIME, "contentType"))
            .or_else(|| node.attribute((namespace::XMIME, "expectedContentTypes")))
    })
    .map_or_else(|| DEFAULT_CONTENT_TYPE.to_owned(), ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        interface::{Interface, SoapVersion},
        operation::{AttachmentDefinition, WsdlOperation},
    };

    fn operation() -> WsdlOperation {
        let interface = Interface::new("DocSoap", SoapVersion::Soap11, ["http://localhost/doc"]);
        WsdlOperation::builder()
            .name("Store")
            .interface(Arc::clone(&interface))
            .request_attachments(vec![AttachmentDefinition::new("scan", ["image/png"])])
            .response_attachments(vec![
                AttachmentDefinition::new("receipt", ["application/pdf"])
                    .with_encoding(AttachmentEncoding::Base64),
            ])
            .build()
    }

    const BODY: &str = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
    xmlns:xmime="http://www.w3.org/2005/05/xmlmime"
    xmlns:d="urn:doc">
  <soapenv:Body>
    <d:Store>
      <d:Photo xmime:contentType="image/jpeg" xsi:type="xs:base64Binary">cid:photo</d:Photo>
      <d:Ref href="cid:contract"/>
      <d:Again>cid:photo</d:Again>
    </d:Store>
  </soapenv:Body>
</soapenv:Envelope>"#;

    #[test]
    fn collects_defined_and_referenced_parts() {
        let parts = XmlAttachmentResolver
            .extract(&operation(), BODY, true, false, false)
            .unwrap();

        let names: Vec<_> = parts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["scan", "photo", "contract"]);

        assert_eq!(parts[0].kind, AttachmentKind::Mime);
        assert_eq!(parts[0].content_type, "image/png");
        assert_eq!(parts[1].kind, AttachmentKind::Content);
        assert_eq!(parts[1].content_type, "image/jpeg");
        assert_eq!(parts[1].encoding, AttachmentEncoding::Base64);
        assert_eq!(parts[2].content_type, DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn mtom_turns_cid_references_into_xop_parts() {
        let parts = XmlAttachmentResolver
            .extract(&operation(), BODY, false, false, true)
            .unwrap();

        let photo = parts.iter().find(|p| p.name == "photo").unwrap();
        assert_eq!(photo.kind, AttachmentKind::Xop);
        assert_eq!(photo.encoding, AttachmentEncoding::None);
    }

    #[test]
    fn xop_include_uses_parent_content_type() {
        let body = r#"<d:Store xmlns:d="urn:doc" xmlns:xop="http://www.w3.org/2004/08/xop/include" xmlns:xmime="http://www.w3.org/2005/05/xmlmime">
  <d:Photo xmime:contentType="image/gif"><xop:Include href="cid:logo"/></d:Photo>
</d:Store>"#;
        let parts = XmlAttachmentResolver
            .extract(&operation(), body, false, false, true)
            .unwrap();

        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].name, "logo");
        assert_eq!(parts[0].kind, AttachmentKind::Xop);
        assert_eq!(parts[0].content_type, "image/gif");
    }

    #[test]
    fn response_scope_only_includes_response_definitions() {
        let parts = XmlAttachmentResolver
            .extract(&operation(), "", false, true, false)
            .unwrap();

        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].name, "receipt");
        assert_eq!(parts[0].encoding, AttachmentEncoding::Base64);
    }

    #[test]
    fn malformed_body_is_an_error() {
        let result = XmlAttachmentResolver.extract(&operation(), "<d:Store>", true, false, false);
        assert!(matches!(result, Err(AttachmentError::Xml(_))));
    }

    #[test]
    fn encoding_lookup_uses_operation_definitions() {
        let op = operation();
        assert_eq!(
            super::super::attachment_encoding(&op, "receipt", Direction::Response),
            AttachmentEncoding::Base64
        );
        assert_eq!(
            super::super::attachment_encoding(&op, "scan", Direction::Response),
            AttachmentEncoding::None
        );
    }
}
