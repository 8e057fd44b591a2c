//! Device settings loaded from an optional TOML file.
//!
//! Every field has a default, so a missing file simply yields
//! [`DeviceSettings::default`]. A file that exists but does not parse is a
//! startup error.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::mqtt::topics::{RPC_REQUEST_TOPIC_FILTER, TELEMETRY_TOPIC};

/// Environment variable pointing at an alternative settings file
pub const SETTINGS_ENV: &str = "TB_DEVICE_SETTINGS";
const SETTINGS_FILE: &str = "device_settings.toml";

const CREDENTIALS_DIR: &str = "Credentials";
const CREDENTIALS_FILE: &str = "credentials.json";

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DeviceSettings {
    /// Directory searched for the credentials file
    pub credentials_dir: PathBuf,
    /// Credentials file name including extension
    pub credentials_file: String,
    /// Topic filters subscribed once the broker accepts the connection
    pub rpc_topics: Vec<String>,
    /// Topic all telemetry is published to
    pub telemetry_topic: String,
    /// Period of the scheduled telemetry task
    pub telemetry_interval_ms: u64,
    pub keep_alive_secs: u64,
    /// Capacity of the request channel between client and event loop
    pub channel_capacity: usize,
    /// Pause after a failed poll before the event loop is polled again
    pub reconnect_delay_ms: u64,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            credentials_dir: PathBuf::from(CREDENTIALS_DIR),
            credentials_file: CREDENTIALS_FILE.to_string(),
            rpc_topics: vec![RPC_REQUEST_TOPIC_FILTER.to_string()],
            telemetry_topic: TELEMETRY_TOPIC.to_string(),
            telemetry_interval_ms: 1000,
            keep_alive_secs: 60,
            channel_capacity: 10,
            reconnect_delay_ms: 5000,
        }
    }
}

impl DeviceSettings {
    /// Path of the settings file, honouring [`SETTINGS_ENV`]
    pub fn settings_path() -> PathBuf {
        std::env::var(SETTINGS_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(SETTINGS_FILE))
    }

    /// Loads settings from `path`, falling back to defaults if it does not exist.
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if settings file exists: {}", e))?
        {
            info!(
                "No settings file at {}, using defaults",
                path.to_string_lossy()
            );
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read settings file {}: {}", path.display(), e))?;

        let settings = Self::from_toml(&content)?;
        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(content).map_err(|e| eyre!("Failed to parse settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.telemetry_interval_ms == 0 {
            return Err(eyre!("telemetry_interval_ms must be greater than zero"));
        }
        if self.rpc_topics.is_empty() {
            return Err(eyre!("At least one RPC topic is required"));
        }
        if self.channel_capacity == 0 {
            return Err(eyre!("channel_capacity must be greater than zero"));
        }
        Ok(())
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry_interval_ms)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}
