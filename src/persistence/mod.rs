//! # Persistence Module
//!
//! Loads the data this device needs before it can talk to the broker.
//! Currently that is only the MQTT client credentials, stored as a flat JSON
//! document next to the binary.
//!
//! ## Error Handling Strategy
//! Loading never falls back to defaults. A missing or malformed credentials
//! file is reported through [`CredentialsError`], logged, and surfaced to the
//! caller as `None` so startup can abort with a diagnostic.

pub mod config_loader;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use config_loader::ConfigLoader;

/// Credentials and endpoint of the MQTT broker.
///
/// Field names follow the camelCase keys of the JSON file. Unknown keys are
/// rejected so a typo fails loudly instead of silently dropping a field.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MqttClientCredentials {
    pub host: String,
    pub port: u16,
    /// Path to the CA certificate the TLS connection is pinned to
    pub ca_cert_path: String,
    pub client_id: String,
    pub username: String,
    pub password: String,
}

/// Reasons a credentials file could not be turned into [`MqttClientCredentials`]
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("Error loading file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Error decoding credentials from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
