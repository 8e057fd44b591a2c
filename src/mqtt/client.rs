use rumqttc::{AsyncClient, EventLoop, QoS};
use std::cell::Cell;
use thiserror::Error;
use tracing::{debug, info};

use super::config::MqttConfig;
use super::topics::rpc_response_topic;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed,
    Reconnecting,
}

#[derive(Debug, Error)]
pub enum DeviceClientError {
    #[error("Unable to read CA certificate {path}: {source}")]
    CaCertificate {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The request could not be queued for the event loop
    #[error("MQTT client rejected request: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("Not an RPC request topic: {0}")]
    InvalidRequestTopic(String),
}

/// The operations the RPC dispatcher and telemetry scheduler need from the
/// broker connection.
///
/// Calls never block: they queue the request and return. Completion is
/// observed later through the event loop.
pub trait DeviceClient {
    fn publish(&self, message: &str, topic: &str) -> Result<(), DeviceClientError>;

    /// Replies to the RPC request received on `rpc_request_topic`
    fn respond_to_rpc_request(
        &self,
        rpc_request_topic: &str,
        response_message: &str,
    ) -> Result<(), DeviceClientError>;

    fn is_connected(&self) -> bool;
}

#[derive(Clone, Debug, Default)]
pub struct MqttStatus {
    pub connection_state: ConnectionState,
    pub messages_received: usize,
    pub messages_sent: usize,
}

/// ThingsBoard device client on top of `rumqttc::AsyncClient`
pub struct TbDeviceClient {
    client: AsyncClient,
    connection_state: ConnectionState,
    messages_received: usize,
    messages_sent: Cell<usize>,
}

impl TbDeviceClient {
    /// Creates the client and the event loop that has to be polled to drive it.
    ///
    /// Nothing is sent until the event loop is polled for the first time.
    pub async fn new(config: &MqttConfig) -> Result<(Self, EventLoop), DeviceClientError> {
        let ca = config.load_ca_certificate().await?;
        let (client, eventloop) =
            AsyncClient::new(config.mqtt_options(ca), config.channel_capacity);
        info!(
            "MQTT client {} created for {}:{}",
            config.client_id, config.host, config.port
        );

        Ok((
            Self {
                client,
                connection_state: ConnectionState::Connecting,
                messages_received: 0,
                messages_sent: Cell::new(0),
            },
            eventloop,
        ))
    }

    pub fn subscribe(&self, topics: &[String]) -> Result<(), DeviceClientError> {
        for topic in topics {
            self.client.try_subscribe(topic.as_str(), QoS::AtLeastOnce)?;
            debug!("Subscribe request queued for {}", topic);
        }
        Ok(())
    }

    pub fn disconnect(&self) -> Result<(), DeviceClientError> {
        self.client.try_disconnect()?;
        Ok(())
    }

    pub fn set_connection_state(&mut self, state: ConnectionState) {
        if self.connection_state != state {
            debug!(
                "Connection state {:?} -> {:?}",
                self.connection_state, state
            );
            self.connection_state = state;
        }
    }

    pub fn record_received(&mut self) {
        self.messages_received += 1;
    }

    pub fn status(&self) -> MqttStatus {
        MqttStatus {
            connection_state: self.connection_state,
            messages_received: self.messages_received,
            messages_sent: self.messages_sent.get(),
        }
    }

    fn send(&self, topic: String, message: &str) -> Result<(), DeviceClientError> {
        self.client
            .try_publish(topic, QoS::AtLeastOnce, false, message.as_bytes().to_vec())?;
        self.messages_sent.set(self.messages_sent.get() + 1);
        Ok(())
    }
}

impl DeviceClient for TbDeviceClient {
    fn publish(&self, message: &str, topic: &str) -> Result<(), DeviceClientError> {
        self.send(topic.to_string(), message)
    }

    fn respond_to_rpc_request(
        &self,
        rpc_request_topic: &str,
        response_message: &str,
    ) -> Result<(), DeviceClientError> {
        let response_topic = rpc_response_topic(rpc_request_topic)
            .ok_or_else(|| DeviceClientError::InvalidRequestTopic(rpc_request_topic.to_string()))?;
        self.send(response_topic, response_message)
    }

    fn is_connected(&self) -> bool {
        self.connection_state == ConnectionState::Connected
    }
}
