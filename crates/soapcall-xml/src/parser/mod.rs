pub use roxmltree::*;

use crate::{XmlError, namespace};

/// Parses `xml` into a read-only document.
///
/// Blank input is rejected with [`XmlError::EmptyDocument`] instead of the
/// less helpful "unexpected end of stream" reported by the parser.
pub fn parse(xml: &str) -> Result<Document<'_>, XmlError> {
    if xml.trim().is_empty() {
        return Err(XmlError::EmptyDocument);
    }

    tracing::trace!(length = xml.len(), "parsing xml document");
    Ok(roxmltree::Document::parse(xml)?)
}

/// Returns the `Body` element of a SOAP envelope, or `None` when the root is
/// not a SOAP 1.1/1.2 envelope.
pub fn soap_body<'a, 'input>(document: &'a Document<'input>) -> Option<Node<'a, 'input>> {
    let root = document.root_element();
    let ns = root.tag_name().namespace()?;
    if root.tag_name().name() != "Envelope" || !namespace::is_soap_envelope(ns) {
        return None;
    }

    root.children()
        .filter(Node::is_element)
        .find(|child| child.tag_name().name() == "Body" && child.tag_name().namespace() == Some(ns))
}

/// Looks an attribute up by local name, ignoring its namespace.
pub fn attribute_local<'a>(node: Node<'a, '_>, local_name: &str) -> Option<&'a str> {
    node.attributes()
        .find(|attr| attr.name() == local_name)
        .map(|attr| attr.value())
}

/// Concatenated text of the direct text children of `node`, trimmed.
pub fn direct_text(node: Node<'_, '_>) -> String {
    node.children()
        .filter(Node::is_text)
        .filter_map(|child| child.text())
        .collect::<String>()
        .trim()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENVELOPE: &str = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:x="urn:x">
  <soapenv:Header/>
  <soapenv:Body>
    <x:Upload x:kind="file">
      <x:Data>  cid:photo  </x:Data>
    </x:Upload>
  </soapenv:Body>
</soapenv:Envelope>"#;

    #[test]
    fn finds_soap_body() {
        let document = parse(ENVELOPE).unwrap();
        let body = soap_body(&document).expect("body");
        assert_eq!(body.tag_name().name(), "Body");
        assert_eq!(body.tag_name().namespace(), Some(namespace::SOAP11_ENVELOPE));
    }

    #[test]
    fn body_is_none_for_non_envelope() {
        let document = parse("<x:Upload xmlns:x=\"urn:x\"/>").unwrap();
        assert!(soap_body(&document).is_none());
    }

    #[test]
    fn reads_direct_text_and_local_attributes() {
        let document = parse(ENVELOPE).unwrap();
        let upload = document
            .descendants()
            .find(|n| n.tag_name().name() == "Upload")
            .unwrap();
        assert_eq!(attribute_local(upload, "kind"), Some("file"));

        let data = document
            .descendants()
            .find(|n| n.tag_name().name() == "Data")
            .unwrap();
        assert_eq!(direct_text(data), "cid:photo");
    }

    #[test]
    fn rejects_blank_documents() {
        assert!(matches!(parse("   "), Err(XmlError::EmptyDocument)));
        assert!(matches!(parse("<a>"), Err(XmlError::ParserError(_))));
    }
}
