//! Scheduled telemetry task with statum state tracking
//!
//! # State Machine
//!
//! ```text
//!        start            stop / connection lost
//! Idle ─────────► Running ─────────────────────► Idle
//!                  │  ▲
//!                  └──┘ start (stop, then fresh ticker)
//! ```
//!
//! Only the `Running` variant of [`TelemetryScheduler`] owns a ticker, so at
//! most one periodic task can exist at any time.

use statum::{machine, state};
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info};

#[state]
#[derive(Debug, Clone)]
pub enum TaskState {
    Idle,
    Running,
}

#[machine]
pub struct TelemetryTask<S: TaskState> {
    period: Duration,
    ticks: u64,
}

impl<S: TaskState> TelemetryTask<S> {
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Ticks fired since the task was last started
    #[cfg(test)]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl TelemetryTask<Idle> {
    pub fn create(period: Duration) -> Self {
        Self::new(period, 0)
    }

    pub fn start(mut self) -> TelemetryTask<Running> {
        info!(
            "Starting scheduled telemetry push task every {:?}",
            self.period
        );
        self.ticks = 0;
        self.transition()
    }
}

impl TelemetryTask<Running> {
    fn record_tick(&mut self) {
        self.ticks += 1;
    }

    pub fn stop(self) -> TelemetryTask<Idle> {
        info!(
            "Stopping scheduled telemetry push task after {} ticks",
            self.ticks
        );
        self.transition()
    }
}

pub enum TelemetryScheduler {
    Idle(TelemetryTask<Idle>),
    Running {
        task: TelemetryTask<Running>,
        ticker: Interval,
    },
}

impl TelemetryScheduler {
    pub fn new(period: Duration) -> Self {
        TelemetryScheduler::Idle(TelemetryTask::create(period))
    }

    pub fn period(&self) -> Duration {
        match self {
            TelemetryScheduler::Idle(task) => task.period(),
            TelemetryScheduler::Running { task, .. } => task.period(),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, TelemetryScheduler::Running { .. })
    }

    /// Starts a fresh ticker, stopping the current one first.
    ///
    /// The first tick fires immediately. Must be called within a tokio runtime.
    pub fn start(&mut self) {
        self.stop();
        self.replace_with(|scheduler| match scheduler {
            TelemetryScheduler::Idle(task) => {
                let task = task.start();
                let mut ticker = interval(task.period());
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                TelemetryScheduler::Running { task, ticker }
            }
            running => running,
        });
    }

    /// Drops the ticker if one is active
    pub fn stop(&mut self) {
        if !self.is_running() {
            debug!("Scheduled telemetry push task not running");
            return;
        }
        self.replace_with(|scheduler| match scheduler {
            TelemetryScheduler::Running { task, .. } => TelemetryScheduler::Idle(task.stop()),
            idle => idle,
        });
    }

    /// Completes on the next tick while running; never completes while idle.
    ///
    /// Cancel safe, so it can be used as a `tokio::select!` branch.
    pub async fn tick(&mut self) {
        match self {
            TelemetryScheduler::Running { task, ticker } => {
                ticker.tick().await;
                task.record_tick();
            }
            TelemetryScheduler::Idle(_) => std::future::pending::<()>().await,
        }
    }

    fn replace_with(&mut self, transition: impl FnOnce(Self) -> Self) {
        let placeholder = TelemetryScheduler::new(self.period());
        let current = std::mem::replace(self, placeholder);
        *self = transition(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Instant};

    const PERIOD: Duration = Duration::from_secs(1);

    #[tokio::test(start_paused = true)]
    async fn starts_idle_and_never_ticks() {
        let mut scheduler = TelemetryScheduler::new(PERIOD);
        assert!(!scheduler.is_running());
        assert!(timeout(Duration::from_secs(10), scheduler.tick())
            .await
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_is_immediate_then_periodic() {
        let mut scheduler = TelemetryScheduler::new(PERIOD);
        scheduler.start();
        assert!(scheduler.is_running());

        let started = Instant::now();
        scheduler.tick().await;
        assert_eq!(started.elapsed(), Duration::ZERO);

        scheduler.tick().await;
        assert_eq!(started.elapsed(), PERIOD);

        scheduler.tick().await;
        assert_eq!(started.elapsed(), PERIOD * 2);

        if let TelemetryScheduler::Running { task, .. } = &scheduler {
            assert_eq!(task.ticks(), 3);
        } else {
            panic!("scheduler should be running");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_the_ticker() {
        let mut scheduler = TelemetryScheduler::new(PERIOD);
        scheduler.start();
        scheduler.tick().await;
        scheduler.tick().await;

        scheduler.start();
        assert!(scheduler.is_running());

        // a fresh ticker fires immediately again and its count starts over
        let restarted = Instant::now();
        scheduler.tick().await;
        assert_eq!(restarted.elapsed(), Duration::ZERO);
        if let TelemetryScheduler::Running { task, .. } = &scheduler {
            assert_eq!(task.ticks(), 1);
        } else {
            panic!("scheduler should be running");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stop_returns_to_idle() {
        let mut scheduler = TelemetryScheduler::new(PERIOD);
        scheduler.start();
        scheduler.stop();
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.period(), PERIOD);
        assert!(timeout(Duration::from_secs(5), scheduler.tick())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn stop_when_idle_is_a_no_op() {
        let mut scheduler = TelemetryScheduler::new(PERIOD);
        scheduler.stop();
        scheduler.stop();
        assert!(!scheduler.is_running());
    }
}
