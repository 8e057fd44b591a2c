use std::time::Duration;

use rumqttc::{ConnectionError, Event, EventLoop, Outgoing, Packet};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::client::{ConnectionState, TbDeviceClient};
use super::config::MqttConfig;
use super::message_manager::MQTTMessage;
use crate::context::DeviceContext;
use crate::rpc::RpcMessageProcessor;

const DISCONNECT_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Drives the MQTT event loop and the telemetry scheduler on one task.
///
/// Every branch of the select loop runs to completion before the next event
/// is handled, which is what lets the context be borrowed mutably without
/// locks.
pub struct MqttHandler {
    eventloop: EventLoop,
    rpc_topics: Vec<String>,
    reconnect_delay: Duration,
}

impl MqttHandler {
    pub fn new(eventloop: EventLoop, config: &MqttConfig) -> Self {
        Self {
            eventloop,
            rpc_topics: config.subbed_topics.clone(),
            reconnect_delay: config.reconnect_delay,
        }
    }

    /// Runs until `shutdown` is cancelled, then disconnects from the broker
    pub async fn run(
        mut self,
        context: &mut DeviceContext<TbDeviceClient>,
        shutdown: CancellationToken,
    ) {
        info!("Starting MQTT event loop");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }

                event = self.eventloop.poll() => {
                    if let Err(e) = self.handle_event(context, event) {
                        error!("Connection failed: {}", e);
                        context
                            .client_mut()
                            .set_connection_state(ConnectionState::Failed);
                        // rumqttc reconnects on the next poll
                        tokio::select! {
                            _ = shutdown.cancelled() => {}
                            _ = sleep(self.reconnect_delay) => {
                                context
                                    .client_mut()
                                    .set_connection_state(ConnectionState::Reconnecting);
                            }
                        }
                    }
                }

                _ = context.next_scheduled_tick() => {
                    context.run_scheduled_tick();
                }
            }
        }

        self.disconnect(context).await;
    }

    fn handle_event(
        &self,
        context: &mut DeviceContext<TbDeviceClient>,
        event: Result<Event, ConnectionError>,
    ) -> Result<(), ConnectionError> {
        match event? {
            Event::Incoming(Packet::ConnAck(ack)) => {
                info!("Connected (CA pinned), session present: {}", ack.session_present);
                context
                    .client_mut()
                    .set_connection_state(ConnectionState::Connected);
                if let Err(e) = context.client().subscribe(&self.rpc_topics) {
                    error!("Subscribe failed: {}", e);
                }
            }
            Event::Incoming(Packet::SubAck(ack)) => {
                info!(
                    "Subscribed to {:?} with {:?}",
                    self.rpc_topics, ack.return_codes
                );
            }
            Event::Incoming(Packet::PubAck(ack)) => {
                info!("Publish {} acknowledged", ack.pkid);
            }
            Event::Incoming(Packet::Publish(publish)) => {
                let message = MQTTMessage::from_publish(&publish);
                info!("Received message {}", message);
                context.client_mut().record_received();
                RpcMessageProcessor::process(context, message.content(), Some(message.topic()));
            }
            Event::Incoming(Packet::Disconnect) => {
                warn!("Broker closed the connection");
                context
                    .client_mut()
                    .set_connection_state(ConnectionState::Disconnected);
            }
            Event::Incoming(packet) => debug!("Incoming = {:?}", packet),
            Event::Outgoing(outgoing) => debug!("Outgoing = {:?}", outgoing),
        }
        Ok(())
    }

    async fn disconnect(mut self, context: &mut DeviceContext<TbDeviceClient>) {
        context.scheduler_mut().stop();

        if let Err(e) = context.client().disconnect() {
            warn!("Unable to queue disconnect: {}", e);
            return;
        }

        let flush = async {
            loop {
                match self.eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        debug!("Event loop closed during disconnect: {}", e);
                        break;
                    }
                }
            }
        };
        if timeout(DISCONNECT_FLUSH_TIMEOUT, flush).await.is_err() {
            warn!("Timed out flushing disconnect");
        }

        context
            .client_mut()
            .set_connection_state(ConnectionState::Disconnected);
        info!("Disconnected, final status: {:?}", context.client().status());
    }
}
