use super::{CredentialsError, MqttClientCredentials};
use std::path::PathBuf;
use tracing::{debug, error};

/// Resolves and decodes credential files relative to a search directory
#[derive(Clone, Debug)]
pub struct ConfigLoader {
    search_path: PathBuf,
}

impl ConfigLoader {
    pub fn new(search_path: impl Into<PathBuf>) -> Self {
        Self {
            search_path: search_path.into(),
        }
    }

    /// Loads MQTT client credentials from `file_name` (including extension).
    ///
    /// Returns `None` if the file could not be read or decoded; the cause is
    /// logged.
    pub async fn load_client_credentials_from_file(
        &self,
        file_name: &str,
    ) -> Option<MqttClientCredentials> {
        match self.try_load_client_credentials(file_name).await {
            Ok(credentials) => {
                debug!(
                    "Loaded credentials for client {} ({}:{})",
                    credentials.client_id, credentials.host, credentials.port
                );
                Some(credentials)
            }
            Err(e) => {
                error!("Error loading config from file {}: {}", file_name, e);
                None
            }
        }
    }

    pub async fn try_load_client_credentials(
        &self,
        file_name: &str,
    ) -> Result<MqttClientCredentials, CredentialsError> {
        let path = self.path_to_resource(file_name);
        let data = tokio::fs::read(&path)
            .await
            .map_err(|source| CredentialsError::Read {
                path: path.display().to_string(),
                source,
            })?;

        serde_json::from_slice(&data).map_err(|source| CredentialsError::Decode {
            path: path.display().to_string(),
            source,
        })
    }

    fn path_to_resource(&self, file_name: &str) -> PathBuf {
        self.search_path.join(file_name)
    }
}
