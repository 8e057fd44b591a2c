//! Error definitions for RPC handling

use crate::mqtt::client::DeviceClientError;
use thiserror::Error;

/// Reasons an RPC message was dropped or only partially handled
#[derive(Debug, Error)]
pub enum RpcError {
    /// Payload is not valid UTF-8
    #[error("Failed to convert message to text: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Payload is not an RPC command
    #[error("Failed to decode RPC command: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Missing '{param}' parameter for method {method}")]
    MissingParameter { method: String, param: &'static str },

    #[error("Unsupported '{param}' value: {value}")]
    UnsupportedValue { param: &'static str, value: i64 },

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    /// The client refused a publish or response
    #[error("Client error: {0}")]
    Client(#[from] DeviceClientError),
}

impl RpcError {
    /// True for errors caused by the request itself rather than the device
    pub fn is_bad_request(&self) -> bool {
        !matches!(self, RpcError::Client(_))
    }
}
