use serde::{Deserialize, Serialize};

/// WS-Addressing settings of a request. Only stored here; headers are
/// produced by the transport layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WsaConfig {
    pub version: WsaVersion,
    pub must_understand: MustUnderstand,
    pub action: Option<String>,
    pub to: Option<String>,
    pub reply_to: Option<String>,
    pub message_id: Option<String>,
    pub generate_message_id: bool,
    pub add_default_to: bool,
    pub add_default_action: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WsaVersion {
    #[default]
    #[serde(rename = "200508")]
    V200508,
    #[serde(rename = "200408")]
    V200408,
}

impl WsaVersion {
    pub const fn namespace(self) -> &'static str {
        match self {
            Self::V200508 => "http://www.w3.org/2005/08/addressing",
            Self::V200408 => "http://schemas.xmlsoap.org/ws/2004/08/addressing",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MustUnderstand {
    #[default]
    NotSend,
    True,
    False,
}
