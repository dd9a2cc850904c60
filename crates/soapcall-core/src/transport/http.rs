use base64::Engine;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug)]
pub struct HttpBuilder {
    url: Url,
    headers: Vec<(String, String)>,
}

impl HttpBuilder {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            headers: vec![],
        }
    }

    /// Sets a header, replacing any value already set under the same name
    /// (names compare case-insensitively).
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            Some(slot) => *slot = (name, value),
            None => self.headers.push((name, value)),
        }
        self
    }

    /// Adds `Authorization: Basic <base64(username:password)>`.
    /// WARNING: never log the resulting header value.
    pub fn with_basic(&mut self, username: &str, password: &str) -> &mut Self {
        let creds = format!("{username}:{password}");
        let b64 = base64::engine::general_purpose::STANDARD.encode(creds.as_bytes());
        self.set_header("Authorization", format!("Basic {b64}"))
    }

    /// `content_type` is only used when no `Content-Type` header was set.
    pub fn post(&mut self, body: String, content_type: &str) -> HttpRequest {
        let mut headers = std::mem::take(&mut self.headers);
        if !headers
            .iter()
            .any(|(key, _)| key.eq_ignore_ascii_case("Content-Type"))
        {
            headers.insert(0, ("Content-Type".to_owned(), content_type.to_owned()));
        }

        HttpRequest {
            method: Method::Post,
            url: self.url.clone(),
            headers,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut builder = HttpBuilder::new(Url::parse("http://localhost/svc").unwrap());
        builder.set_header("SOAPAction", "\"a\"");
        builder.set_header("soapaction", "\"b\"");
        let request = builder.post("<x/>".into(), "text/xml;charset=UTF-8");

        assert_eq!(request.headers.len(), 2);
        assert_eq!(request.header("SOAPACTION"), Some("\"b\""));
        assert_eq!(request.header("content-type"), Some("text/xml;charset=UTF-8"));
    }

    #[test]
    fn explicit_content_type_wins() {
        let mut builder = HttpBuilder::new(Url::parse("http://localhost/svc").unwrap());
        builder.set_header("content-type", "application/xml");
        let request = builder.post(String::new(), "text/xml;charset=UTF-8");
        assert_eq!(request.header("Content-Type"), Some("application/xml"));
        assert_eq!(request.headers.len(), 1);
    }

    #[test]
    fn basic_auth_is_base64_encoded() {
        let mut builder = HttpBuilder::new(Url::parse("https://localhost/svc").unwrap());
        builder.with_basic("admin", "secret");
        let request = builder.post(String::new(), "text/xml");
        assert_eq!(request.header("Authorization"), Some("Basic YWRtaW46c2VjcmV0"));
        assert_eq!(request.method.as_str(), "POST");
    }
}
