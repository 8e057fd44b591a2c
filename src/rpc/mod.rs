//! RPC commands sent by the IoT cloud to this device.
//!
//! Commands arrive as JSON on the RPC request topic, for example
//! `{"method":"getRandom","params":{"number":1}}`, and are handled by
//! [`RpcMessageProcessor`].

pub mod error;
pub mod processor;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use error::RpcError;
pub use processor::{RpcMessageProcessor, RpcOutcome};

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RpcCommand {
    pub method: String,
    #[serde(default)]
    pub params: Option<HashMap<String, i64>>,
}

impl RpcCommand {
    pub fn param(&self, name: &str) -> Option<i64> {
        self.params.as_ref()?.get(name).copied()
    }

    pub fn rpc_method(&self) -> RpcMethod {
        RpcMethod::from(self.method.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcMethod {
    GetRandom,
    RunScheduler,
    SchedulerIsRunning,
    Unknown(String),
}

impl From<&str> for RpcMethod {
    fn from(method: &str) -> Self {
        match method {
            "getRandom" => RpcMethod::GetRandom,
            "runScheduler" => RpcMethod::RunScheduler,
            "schedulerIsRunning" => RpcMethod::SchedulerIsRunning,
            other => RpcMethod::Unknown(other.to_string()),
        }
    }
}
