use super::{RpcCommand, RpcError, RpcMethod};
use crate::context::DeviceContext;
use crate::mqtt::client::DeviceClient;
use crate::telemetry::{TelemetryKind, TelemetryPoint};
use tracing::{debug, error, info, warn};

/// What a successfully handled RPC command did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcOutcome {
    TelemetryPublished(TelemetryPoint),
    SchedulerStarted,
    SchedulerStopped,
    /// `schedulerIsRunning` answered with the given flag
    SchedulerStatusSent(&'static str),
    /// `schedulerIsRunning` without a request topic to answer on
    NoResponseTopic,
}

/// Evaluates RPC messages received from the IoT cloud
pub struct RpcMessageProcessor;

impl RpcMessageProcessor {
    /// Processes one RPC message.
    ///
    /// Never fails: malformed or unsupported commands are logged and dropped.
    /// `topic` is the request topic and is only needed for commands that
    /// answer the caller.
    pub fn process<C: DeviceClient>(
        context: &mut DeviceContext<C>,
        message: &[u8],
        topic: Option<&str>,
    ) {
        match Self::try_process(context, message, topic) {
            Ok(outcome) => debug!("RPC handled: {:?}", outcome),
            Err(e @ (RpcError::InvalidUtf8(_) | RpcError::Decode(_))) => error!("{}", e),
            Err(e @ RpcError::UnknownMethod(_)) => info!("{}", e),
            Err(e) if e.is_bad_request() => warn!("{}", e),
            Err(e) => error!("RPC handling failed: {}", e),
        }
    }

    pub fn try_process<C: DeviceClient>(
        context: &mut DeviceContext<C>,
        message: &[u8],
        topic: Option<&str>,
    ) -> Result<RpcOutcome, RpcError> {
        let text = std::str::from_utf8(message)?;
        let command: RpcCommand = serde_json::from_str(text)?;

        match command.rpc_method() {
            RpcMethod::GetRandom => Self::get_random(context, &command),
            RpcMethod::RunScheduler => Self::run_scheduler(context, &command),
            RpcMethod::SchedulerIsRunning => Self::scheduler_is_running(context, topic),
            RpcMethod::Unknown(method) => Err(RpcError::UnknownMethod(method)),
        }
    }

    fn get_random<C: DeviceClient>(
        context: &mut DeviceContext<C>,
        command: &RpcCommand,
    ) -> Result<RpcOutcome, RpcError> {
        let number = Self::required_param(command, "number")?;
        // number 3 is intentionally not offered, random3 belongs to the scheduler
        let kind = match number {
            1 => TelemetryKind::Random1,
            2 => TelemetryKind::Random2,
            value => {
                return Err(RpcError::UnsupportedValue {
                    param: "number",
                    value,
                })
            }
        };

        let point = TelemetryPoint::sample(kind);
        context.publish_telemetry(point)?;
        Ok(RpcOutcome::TelemetryPublished(point))
    }

    fn run_scheduler<C: DeviceClient>(
        context: &mut DeviceContext<C>,
        command: &RpcCommand,
    ) -> Result<RpcOutcome, RpcError> {
        match Self::required_param(command, "enable")? {
            0 => {
                context.scheduler_mut().stop();
                Ok(RpcOutcome::SchedulerStopped)
            }
            1 => {
                context.scheduler_mut().start();
                Ok(RpcOutcome::SchedulerStarted)
            }
            value => Err(RpcError::UnsupportedValue {
                param: "enable",
                value,
            }),
        }
    }

    fn scheduler_is_running<C: DeviceClient>(
        context: &mut DeviceContext<C>,
        topic: Option<&str>,
    ) -> Result<RpcOutcome, RpcError> {
        let Some(topic) = topic else {
            debug!("schedulerIsRunning without request topic, nothing to answer");
            return Ok(RpcOutcome::NoResponseTopic);
        };

        let flag = if context.scheduler().is_running() {
            "1"
        } else {
            "0"
        };
        context.client().respond_to_rpc_request(topic, flag)?;
        info!("Answered schedulerIsRunning on {} with {}", topic, flag);
        Ok(RpcOutcome::SchedulerStatusSent(flag))
    }

    fn required_param(command: &RpcCommand, param: &'static str) -> Result<i64, RpcError> {
        command.param(param).ok_or_else(|| RpcError::MissingParameter {
            method: command.method.clone(),
            param,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::client::mock::RecordingClient;
    use serde_json::Value;
    use std::time::Duration;

    const TELEMETRY: &str = "v1/devices/me/telemetry";
    const REQUEST: &str = "v1/devices/me/rpc/request/17";
    const RESPONSE: &str = "v1/devices/me/rpc/response/17";

    fn context() -> DeviceContext<RecordingClient> {
        DeviceContext::new(RecordingClient::connected(), TELEMETRY, Duration::from_secs(1))
    }

    fn send(context: &mut DeviceContext<RecordingClient>, message: &str) {
        RpcMessageProcessor::process(context, message.as_bytes(), Some(REQUEST));
    }

    fn published_value(context: &DeviceContext<RecordingClient>, key: &str) -> i64 {
        let messages = context.client().published_messages();
        assert_eq!(messages.len(), 1, "expected exactly one publish");
        let parsed: Value = serde_json::from_str(&messages[0]).unwrap();
        let object = parsed.as_object().unwrap();
        assert_eq!(object.len(), 1);
        object[key].as_i64().unwrap()
    }

    fn last_response(context: &DeviceContext<RecordingClient>) -> (String, String) {
        context.client().responses.borrow().last().cloned().unwrap()
    }

    #[test]
    fn get_random_one_publishes_random1() {
        let mut context = context();
        send(&mut context, r#"{"method":"getRandom","params":{"number":1}}"#);

        let value = published_value(&context, "random1");
        assert!((0..=500).contains(&value));
        assert_eq!(context.client().published.borrow()[0].1, TELEMETRY);
    }

    #[test]
    fn get_random_two_publishes_random2() {
        let mut context = context();
        send(&mut context, r#"{"method":"getRandom","params":{"number":2}}"#);

        let value = published_value(&context, "random2");
        assert!((501..=999).contains(&value));
    }

    #[test]
    fn get_random_other_values_publish_nothing() {
        let mut context = context();
        for number in [0, 3, -1, 42] {
            let message = format!(r#"{{"method":"getRandom","params":{{"number":{number}}}}}"#);
            assert!(matches!(
                RpcMessageProcessor::try_process(&mut context, message.as_bytes(), None),
                Err(RpcError::UnsupportedValue { param: "number", .. })
            ));
        }
        assert!(context.client().published.borrow().is_empty());
    }

    #[test]
    fn get_random_without_number_publishes_nothing() {
        let mut context = context();
        let result = RpcMessageProcessor::try_process(
            &mut context,
            br#"{"method":"getRandom","params":{"enable":1}}"#,
            None,
        );
        assert!(matches!(
            result,
            Err(RpcError::MissingParameter { param: "number", .. })
        ));
        send(&mut context, r#"{"method":"getRandom"}"#);
        assert!(context.client().published.borrow().is_empty());
    }

    #[tokio::test]
    async fn run_scheduler_twice_keeps_one_task() {
        let mut context = context();
        send(&mut context, r#"{"method":"runScheduler","params":{"enable":1}}"#);
        send(&mut context, r#"{"method":"runScheduler","params":{"enable":1}}"#);
        assert!(context.scheduler().is_running());

        send(&mut context, r#"{"method":"runScheduler","params":{"enable":0}}"#);
        assert!(!context.scheduler().is_running());
    }

    #[tokio::test]
    async fn run_scheduler_disable_when_idle_is_a_no_op() {
        let mut context = context();
        let outcome = RpcMessageProcessor::try_process(
            &mut context,
            br#"{"method":"runScheduler","params":{"enable":0}}"#,
            Some(REQUEST),
        )
        .unwrap();
        assert_eq!(outcome, RpcOutcome::SchedulerStopped);
        assert!(!context.scheduler().is_running());
    }

    #[tokio::test]
    async fn run_scheduler_rejects_other_values() {
        let mut context = context();
        send(&mut context, r#"{"method":"runScheduler","params":{"enable":1}}"#);

        let result = RpcMessageProcessor::try_process(
            &mut context,
            br#"{"method":"runScheduler","params":{"enable":2}}"#,
            Some(REQUEST),
        );
        assert!(matches!(
            result,
            Err(RpcError::UnsupportedValue { param: "enable", value: 2 })
        ));
        assert!(context.scheduler().is_running());

        let result = RpcMessageProcessor::try_process(
            &mut context,
            br#"{"method":"runScheduler"}"#,
            Some(REQUEST),
        );
        assert!(matches!(
            result,
            Err(RpcError::MissingParameter { param: "enable", .. })
        ));
        assert!(context.scheduler().is_running());
    }

    #[tokio::test]
    async fn scheduler_is_running_reflects_state() {
        let mut context = context();
        send(&mut context, r#"{"method":"schedulerIsRunning"}"#);
        assert_eq!(
            last_response(&context),
            (RESPONSE.to_string(), "0".to_string())
        );

        send(&mut context, r#"{"method":"runScheduler","params":{"enable":1}}"#);
        send(&mut context, r#"{"method":"schedulerIsRunning","params":null}"#);
        assert_eq!(
            last_response(&context),
            (RESPONSE.to_string(), "1".to_string())
        );

        send(&mut context, r#"{"method":"runScheduler","params":{"enable":0}}"#);
        send(&mut context, r#"{"method":"schedulerIsRunning"}"#);
        assert_eq!(
            last_response(&context),
            (RESPONSE.to_string(), "0".to_string())
        );
    }

    #[test]
    fn scheduler_is_running_ignores_connection_state() {
        let mut context = context();
        context.client().connected.set(false);
        send(&mut context, r#"{"method":"schedulerIsRunning"}"#);
        assert_eq!(last_response(&context).1, "0");
    }

    #[test]
    fn scheduler_is_running_without_topic_does_nothing() {
        let mut context = context();
        let outcome = RpcMessageProcessor::try_process(
            &mut context,
            br#"{"method":"schedulerIsRunning"}"#,
            None,
        )
        .unwrap();
        assert_eq!(outcome, RpcOutcome::NoResponseTopic);
        assert!(context.client().responses.borrow().is_empty());
    }

    #[test]
    fn scheduler_is_running_on_non_rpc_topic_is_a_client_error() {
        let mut context = context();
        let result = RpcMessageProcessor::try_process(
            &mut context,
            br#"{"method":"schedulerIsRunning"}"#,
            Some(TELEMETRY),
        );
        assert!(matches!(result, Err(RpcError::Client(_))));
    }

    #[test]
    fn unknown_method_is_ignored() {
        let mut context = context();
        let result = RpcMessageProcessor::try_process(
            &mut context,
            br#"{"method":"reboot","params":{"delay":5}}"#,
            Some(REQUEST),
        );
        assert!(matches!(result, Err(RpcError::UnknownMethod(method)) if method == "reboot"));
        assert!(context.client().published.borrow().is_empty());
        assert!(context.client().responses.borrow().is_empty());
    }

    #[test]
    fn malformed_payloads_are_dropped() {
        let mut context = context();
        for message in [
            "",
            "not json",
            "{\"method\":",
            "[1,2,3]",
            r#"{"params":{"number":1}}"#,
            r#"{"method":"getRandom","params":{"number":1.5}}"#,
        ] {
            send(&mut context, message);
        }
        RpcMessageProcessor::process(&mut context, &[0xff, 0xfe, 0x00], Some(REQUEST));

        assert!(matches!(
            RpcMessageProcessor::try_process(&mut context, &[0xc3, 0x28], None),
            Err(RpcError::InvalidUtf8(_))
        ));
        assert!(matches!(
            RpcMessageProcessor::try_process(&mut context, b"not json", None),
            Err(RpcError::Decode(_))
        ));
        assert!(context.client().published.borrow().is_empty());
        assert!(context.client().responses.borrow().is_empty());
    }
}
