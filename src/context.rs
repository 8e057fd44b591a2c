//! Device state shared by the RPC dispatcher and the scheduled telemetry task
//!
//! Owned by `main` and lent out as `&mut` to whichever event is being handled.

use crate::mqtt::client::{DeviceClient, DeviceClientError};
use crate::telemetry::{TelemetryKind, TelemetryPoint, TelemetryScheduler};
use std::time::Duration;
use tracing::{error, info, warn};

pub struct DeviceContext<C: DeviceClient> {
    client: C,
    telemetry_topic: String,
    scheduler: TelemetryScheduler,
}

impl<C: DeviceClient> DeviceContext<C> {
    pub fn new(
        client: C,
        telemetry_topic: impl Into<String>,
        telemetry_interval: Duration,
    ) -> Self {
        Self {
            client,
            telemetry_topic: telemetry_topic.into(),
            scheduler: TelemetryScheduler::new(telemetry_interval),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    pub fn telemetry_topic(&self) -> &str {
        &self.telemetry_topic
    }

    pub fn scheduler(&self) -> &TelemetryScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut TelemetryScheduler {
        &mut self.scheduler
    }

    /// Queues `point` for publishing on the telemetry topic.
    ///
    /// `Ok` only means the request reached the client's outgoing queue; the
    /// broker's PubAck is logged by the MQTT handler.
    pub fn publish_telemetry(&self, point: TelemetryPoint) -> Result<(), DeviceClientError> {
        let message = point.to_payload();
        self.client.publish(&message, &self.telemetry_topic)?;
        info!("Telemetry queued for publish: {}", message);
        Ok(())
    }

    /// Waits for the scheduler's next tick; pending forever while idle
    pub async fn next_scheduled_tick(&mut self) {
        self.scheduler.tick().await
    }

    /// Handles one scheduler tick.
    ///
    /// Publishes a `random3` point while connected. A lost connection stops
    /// the scheduler instead.
    pub fn run_scheduled_tick(&mut self) {
        if !self.client.is_connected() {
            self.scheduler.stop();
            warn!("Client lost connection, stopping scheduled telemetry push task.");
            return;
        }

        let point = TelemetryPoint::sample(TelemetryKind::Random3);
        if let Err(e) = self.publish_telemetry(point) {
            error!("Unable to queue telemetry: {}", e);
        }
    }
}
