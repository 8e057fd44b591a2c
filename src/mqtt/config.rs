use crate::config::DeviceSettings;
use crate::persistence::MqttClientCredentials;
use rumqttc::{MqttOptions, TlsConfiguration, Transport};
use std::path::PathBuf;
use std::time::Duration;

use super::client::DeviceClientError;

/// Everything needed to open the broker connection
#[derive(Debug, Clone, PartialEq)]
pub struct MqttConfig {
    pub client_id: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub ca_cert_path: PathBuf,
    pub keep_alive: Duration,
    pub channel_capacity: usize,
    pub subbed_topics: Vec<String>,
    /// Pause after a failed poll before the event loop is polled again
    pub reconnect_delay: Duration,
}

impl MqttConfig {
    pub fn from_credentials(
        credentials: &MqttClientCredentials,
        settings: &DeviceSettings,
    ) -> Self {
        Self {
            client_id: credentials.client_id.clone(),
            host: credentials.host.clone(),
            port: credentials.port,
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            ca_cert_path: PathBuf::from(&credentials.ca_cert_path),
            keep_alive: settings.keep_alive(),
            channel_capacity: settings.channel_capacity,
            subbed_topics: settings.rpc_topics.clone(),
            reconnect_delay: settings.reconnect_delay(),
        }
    }

    /// Reads the CA certificate the TLS transport is pinned to
    pub async fn load_ca_certificate(&self) -> Result<Vec<u8>, DeviceClientError> {
        tokio::fs::read(&self.ca_cert_path)
            .await
            .map_err(|source| DeviceClientError::CaCertificate {
                path: self.ca_cert_path.display().to_string(),
                source,
            })
    }

    /// Builds rumqttc options using `ca` as the only trusted root
    pub fn mqtt_options(&self, ca: Vec<u8>) -> MqttOptions {
        let mut mqtt_options =
            MqttOptions::new(self.client_id.clone(), self.host.clone(), self.port);
        mqtt_options
            .set_credentials(self.username.clone(), self.password.clone())
            .set_keep_alive(self.keep_alive)
            .set_transport(Transport::Tls(TlsConfiguration::Simple {
                ca,
                alpn: None,
                client_auth: None,
            }));
        mqtt_options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> MqttClientCredentials {
        MqttClientCredentials {
            host: "tb.example.com".to_string(),
            port: 8883,
            ca_cert_path: "/nonexistent/tinytb/ca.pem".to_string(),
            client_id: "device-7".to_string(),
            username: "user".to_string(),
            password: "pw".to_string(),
        }
    }

    #[test]
    fn config_combines_credentials_and_settings() {
        let settings = DeviceSettings {
            keep_alive_secs: 15,
            channel_capacity: 32,
            ..DeviceSettings::default()
        };
        let config = MqttConfig::from_credentials(&credentials(), &settings);

        assert_eq!(config.client_id, "device-7");
        assert_eq!(config.port, 8883);
        assert_eq!(config.keep_alive, Duration::from_secs(15));
        assert_eq!(config.channel_capacity, 32);
        assert_eq!(config.subbed_topics, vec!["v1/devices/me/rpc/request/+"]);
        assert_eq!(config.reconnect_delay, Duration::from_millis(5000));
    }

    #[test]
    fn options_point_at_broker() {
        let config = MqttConfig::from_credentials(&credentials(), &DeviceSettings::default());
        let options = config.mqtt_options(b"ca".to_vec());

        assert_eq!(options.client_id(), "device-7");
        assert_eq!(
            options.broker_address(),
            ("tb.example.com".to_string(), 8883)
        );
        assert_eq!(options.keep_alive(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn unreadable_ca_certificate_is_an_error() {
        let config = MqttConfig::from_credentials(&credentials(), &DeviceSettings::default());
        assert!(matches!(
            config.load_ca_certificate().await,
            Err(DeviceClientError::CaCertificate { .. })
        ));
    }
}
