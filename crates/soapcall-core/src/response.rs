use std::time::Duration;

/// Result of one exchange, as stored on the request that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    pub content: String,
    pub content_type: Option<String>,
    /// Body that was actually sent, after property expansion.
    pub request_content: String,
    pub time_taken: Duration,
}

impl Response {
    pub fn content_length(&self) -> usize {
        self.content.len()
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}
