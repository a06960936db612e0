use serde::{Deserialize, Serialize};

/// A proxy or target endpoint as described by the management API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub connection: Connection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    #[serde(rename = "sSLInfo", default, skip_serializing_if = "Option::is_none")]
    pub ssl_info: Option<SslInfo>,
    /// Only present on proxy endpoints.
    #[serde(default)]
    pub virtual_host: Vec<String>,
}

impl Connection {
    pub fn kind(&self) -> Option<ConnectionType> {
        self.connection_type.as_deref().and_then(ConnectionType::from_api)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SslInfo {
    /// Edge sends `"true"`/`"false"` strings; tolerate real booleans too.
    #[serde(default)]
    pub enabled: Option<serde_json::Value>,
}

impl SslInfo {
    pub fn is_enabled(&self) -> bool {
        match &self.enabled {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

/// Target connection kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Hosted,
    Http,
    Local,
    Node,
}

impl ConnectionType {
    /// Parse the `connectionType` value reported by the API.
    pub fn from_api(s: &str) -> Option<Self> {
        match s {
            "hostedTarget" => Some(Self::Hosted),
            "httpConnection" => Some(Self::Http),
            "localTargetConnection" => Some(Self::Local),
            "scriptConnection" => Some(Self::Node),
            _ => None,
        }
    }

    /// Parse the short name used on the command line.
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hosted" => Some(Self::Hosted),
            "http" => Some(Self::Http),
            "local" => Some(Self::Local),
            "node" | "script" => Some(Self::Node),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hosted => write!(f, "hosted"),
            Self::Http => write!(f, "http"),
            Self::Local => write!(f, "local"),
            Self::Node => write!(f, "node"),
        }
    }
}
