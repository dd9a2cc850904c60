//! Namespace URIs that show up in SOAP message bodies.

pub const SOAP11_ENVELOPE: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SOAP12_ENVELOPE: &str = "http://www.w3.org/2003/05/soap-envelope";

/// XML-binary Optimized Packaging, used by MTOM.
pub const XOP: &str = "http://www.w3.org/2004/08/xop/include";

/// Describing Media Content of Binary Data in XML.
pub const XMIME: &str = "http://www.w3.org/2005/05/xmlmime";

pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

pub fn is_soap_envelope(namespace: &str) -> bool {
    namespace == SOAP11_ENVELOPE || namespace == SOAP12_ENVELOPE
}
