//! Synthetic telemetry published by the device
//!
//! Each point is a single random integer under a fixed key, rendered as a
//! one-entry JSON object such as `{"random1": 42}`.

pub mod scheduler;

use rand::Rng;
use serde_json::json;
use std::ops::RangeInclusive;

pub use scheduler::TelemetryScheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryKind {
    /// Requested via `getRandom` with `number == 1`
    Random1,
    /// Requested via `getRandom` with `number == 2`
    Random2,
    /// Published by the scheduled task
    Random3,
}

impl TelemetryKind {
    pub fn key(self) -> &'static str {
        match self {
            TelemetryKind::Random1 => "random1",
            TelemetryKind::Random2 => "random2",
            TelemetryKind::Random3 => "random3",
        }
    }

    pub fn range(self) -> RangeInclusive<i64> {
        match self {
            TelemetryKind::Random1 => 0..=500,
            TelemetryKind::Random2 => 501..=999,
            TelemetryKind::Random3 => 1000..=1500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryPoint {
    pub kind: TelemetryKind,
    pub value: i64,
}

impl TelemetryPoint {
    pub fn sample(kind: TelemetryKind) -> Self {
        Self::sample_with(kind, &mut rand::thread_rng())
    }

    pub fn sample_with<R: Rng + ?Sized>(kind: TelemetryKind, rng: &mut R) -> Self {
        Self {
            kind,
            value: rng.gen_range(kind.range()),
        }
    }

    pub fn to_payload(&self) -> String {
        let mut payload = json!({});
        payload[self.kind.key()] = json!(self.value);
        payload.to_string()
    }
}
