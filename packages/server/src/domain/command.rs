//! Frame command: the `(resource, method)` pair endpoints are keyed by.

use serde::{Deserialize, Serialize};

/// Frame method. Serialized as its integer code; codes the server does not
/// know survive decoding as [`Method::Unknown`] so they can be answered with
/// an "unsupported method" error instead of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum Method {
    Get,
    Delete,
    Post,
    Patch,
    Notify,
    Error,
    Heartbeat,
    Unknown(u8),
}

impl From<u8> for Method {
    fn from(value: u8) -> Self {
        match value {
            1 => Method::Get,
            2 => Method::Delete,
            3 => Method::Post,
            4 => Method::Patch,
            5 => Method::Notify,
            6 => Method::Error,
            7 => Method::Heartbeat,
            other => Method::Unknown(other),
        }
    }
}

impl From<Method> for u8 {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => 1,
            Method::Delete => 2,
            Method::Post => 3,
            Method::Patch => 4,
            Method::Notify => 5,
            Method::Error => 6,
            Method::Heartbeat => 7,
            Method::Unknown(other) => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "ressource")]
    pub resource: String,
    pub method: Method,
}

impl Command {
    pub fn new(resource: impl Into<String>, method: Method) -> Self {
        Self {
            resource: resource.into(),
            method,
        }
    }

    /// Command carried by every error frame.
    pub fn error() -> Self {
        Self::new("", Method::Error)
    }

    pub fn is_heartbeat(&self) -> bool {
        self.method == Method::Heartbeat
    }
}
