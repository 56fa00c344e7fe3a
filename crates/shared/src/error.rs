use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Prohibited,
    Notauth,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Prohibited => "prohibited",
            ErrorKind::Notauth => "notauth",
        }
    }
}

/// Server-reported error, carried in the `error` context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsError {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    pub msg: String,
}

impl WsError {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            msg: msg.into(),
        }
    }

    pub fn prohibited(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Prohibited, msg)
    }

    pub fn not_authorized(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Notauth, msg)
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    Envelope(#[source] serde_json::Error),
    #[error("malformed {ctx} payload: {source}")]
    Payload {
        ctx: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{ctx} payload must be a JSON object")]
    NotAnObject { ctx: &'static str },
    #[error("{ctx} payload is missing flag {flag}")]
    MissingFlag {
        ctx: &'static str,
        flag: &'static str,
    },
}
