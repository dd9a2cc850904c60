//! Persisted configuration of a request.
//!
//! The storage format is owned by the embedding application; this module only
//! defines the shape that gets (de)serialized.

mod headers;
pub mod settings;
mod wsa;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub use headers::RequestHeaders;
pub use settings::Settings;
pub use wsa::{MustUnderstand, WsaConfig, WsaVersion};

pub const DEFAULT_ENCODING: &str = "UTF-8";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestConfig {
    pub name: String,
    pub encoding: Option<String>,
    pub endpoint: Option<String>,
    pub request_content: String,
    pub headers: RequestHeaders,
    pub credentials: Option<Credentials>,
    pub wss_password_type: Option<String>,
    pub incoming_wss: Option<String>,
    pub outgoing_wss: Option<String>,
    pub use_ws_addressing: bool,
    pub wsa_config: Option<WsaConfig>,
    pub attachments: Vec<AttachmentConfig>,
    pub settings: Settings,
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub domain: Option<String>,
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.username.as_deref().is_none_or(str::is_empty)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("domain", &self.domain)
            .finish()
    }
}

/// A file attached to the outgoing request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttachmentConfig {
    pub name: String,
    pub content_type: String,
    /// Attachment part this file is bound to, if any.
    pub part: Option<String>,
    pub content_id: Option<String>,
    /// Location of the content (file path or URL).
    pub url: Option<String>,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WssPasswordType {
    None,
    Digest,
    Text,
}

impl WssPasswordType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Digest => "PasswordDigest",
            Self::Text => "PasswordText",
        }
    }
}

impl fmt::Display for WssPasswordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown WSS password type: {0}")]
pub struct UnknownPasswordType(pub String);

impl FromStr for WssPasswordType {
    type Err = UnknownPasswordType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "None" => Ok(Self::None),
            "PasswordDigest" => Ok(Self::Digest),
            "PasswordText" => Ok(Self::Text),
            other => Err(UnknownPasswordType(other.to_owned())),
        }
    }
}
