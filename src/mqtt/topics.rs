//! ThingsBoard device topic conventions

/// Wildcard filter matching every RPC request sent to this device
pub const RPC_REQUEST_TOPIC_FILTER: &str = "v1/devices/me/rpc/request/+";
pub const TELEMETRY_TOPIC: &str = "v1/devices/me/telemetry";

const RPC_REQUEST_SEGMENT: &str = "/rpc/request/";
const RPC_RESPONSE_SEGMENT: &str = "/rpc/response/";

/// Maps `v1/devices/me/rpc/request/{id}` onto `v1/devices/me/rpc/response/{id}`.
///
/// Returns `None` if the topic is not an RPC request topic or carries no
/// request id.
pub fn rpc_response_topic(request_topic: &str) -> Option<String> {
    let (prefix, request_id) = request_topic.rsplit_once(RPC_REQUEST_SEGMENT)?;
    if request_id.is_empty() || request_id.contains('/') || request_id == "+" {
        return None;
    }
    Some(format!("{prefix}{RPC_RESPONSE_SEGMENT}{request_id}"))
}
