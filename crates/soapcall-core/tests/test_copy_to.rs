use std::sync::Arc;

use soapcall_core::{
    Credentials, Interface, Operation, Request, RequestConfig, SoapVersion, WsdlOperation,
    config::{AttachmentConfig, RequestHeaders},
};

fn operation() -> Arc<dyn Operation> {
    let interface = Interface::new("QuoteSoap", SoapVersion::Soap11, ["http://a/quote"]);
    Arc::new(
        WsdlOperation::builder()
            .name("GetQuote")
            .interface(interface)
            .build(),
    )
}

fn attachment(name: &str) -> AttachmentConfig {
    AttachmentConfig {
        name: name.into(),
        content_type: "application/pdf".into(),
        ..AttachmentConfig::default()
    }
}

fn source() -> Arc<Request> {
    let request = Request::new(
        operation(),
        RequestConfig {
            name: "source".into(),
            endpoint: Some("http://source/quote".into()),
            encoding: Some("ISO-8859-1".into()),
            request_content: "<source/>".into(),
            wss_password_type: Some("PasswordDigest".into()),
            credentials: Some(Credentials {
                username: Some("admin".into()),
                password: Some("secret".into()),
                domain: Some("CORP".into()),
            }),
            headers: RequestHeaders::from_iter([("X-Source", "1")]),
            ..RequestConfig::default()
        },
    );
    request.add_attachment(attachment("source.pdf"));
    request
}

fn target() -> Arc<Request> {
    let request = Request::new(
        operation(),
        RequestConfig {
            name: "target".into(),
            headers: RequestHeaders::from_iter([("X-Target", "1")]),
            credentials: Some(Credentials {
                username: Some("guest".into()),
                ..Credentials::default()
            }),
            ..RequestConfig::default()
        },
    );
    request.add_attachment(attachment("target.pdf"));
    request
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_core_settings_only() {
        let (source, target) = (source(), target());

        source.copy_to(&target, false, false);

        assert_eq!(target.endpoint().as_deref(), Some("http://source/quote"));
        assert_eq!(target.encoding(), "ISO-8859-1");
        assert_eq!(target.request_content(), "<source/>");
        assert_eq!(target.wss_password_type().as_deref(), Some("PasswordDigest"));
        assert_eq!(target.username().as_deref(), Some("admin"));
        assert_eq!(target.domain().as_deref(), Some("CORP"));

        assert_eq!(target.name(), "target");
        assert_eq!(target.headers(), RequestHeaders::from_iter([("X-Target", "1")]));
        let attachments: Vec<_> = target.attachments().into_iter().map(|a| a.name).collect();
        assert_eq!(attachments, vec!["target.pdf"]);
    }

    #[test]
    fn copies_attachments_and_headers_on_request() {
        let (source, target) = (source(), target());

        source.copy_to(&target, true, true);

        assert_eq!(target.headers(), source.headers());
        assert_eq!(target.attachments(), source.attachments());
    }

    #[test]
    fn credentials_are_kept_when_source_has_none() {
        let source = Request::new(
            operation(),
            RequestConfig {
                endpoint: Some("http://source/quote".into()),
                ..RequestConfig::default()
            },
        );
        let target = target();

        source.copy_to(&target, false, false);

        assert_eq!(target.username().as_deref(), Some("guest"));
        assert_eq!(target.wss_password_type(), None);
    }

    #[test]
    fn copy_is_deep() {
        let (source, target) = (source(), target());
        source.copy_to(&target, false, false);

        source.set_password(Some("changed".into()));
        assert_eq!(target.password().as_deref(), Some("secret"));
    }
}
