//! # MQTT Integration Module
//!
//! Connects the device to a ThingsBoard-style broker and keeps the connection
//! serviced. The protocol work itself (TLS, acknowledgements, reconnects) is
//! done by `rumqttc`; this module only adapts it to the device's needs.
//!
//! ## Module Architecture
//!
//! ```text
//! mqtt/
//! ├── config.rs           - Broker options built from credentials and settings
//! ├── client.rs           - DeviceClient seam and the rumqttc-backed client
//! ├── message_manager.rs  - Inbound message representation
//! ├── mqtt_handler.rs     - Event loop driver, scheduler ticks and shutdown
//! └── topics.rs           - RPC and telemetry topic conventions
//! ```
//!
//! Everything runs on a single task: the handler's select loop owns the
//! `rumqttc::EventLoop` and borrows the [`DeviceContext`](crate::context::DeviceContext)
//! mutably for each event, so no state is shared between threads.

pub mod client;
pub mod config;
pub mod message_manager;
pub mod mqtt_handler;
pub mod topics;
