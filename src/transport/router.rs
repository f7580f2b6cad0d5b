//! Response routing into control stats.
//!
//! Every `RequestResponse` passes through [`route_response`], whether or
//! not a caller is waiting on it.

// ============================================================================
// Imports
// ============================================================================

use tracing::{debug, trace, warn};

use crate::protocol::{RequestResponse, RequestType};
use crate::status::{ControlUpdate, Endpoint, LinkStatus, StatusAggregator};

// ============================================================================
// Router
// ============================================================================

/// Applies a response to the aggregator.
///
/// | Request type | Effect |
/// |--------------|--------|
/// | `GetSceneList` | `scenes = len(responseData.scenes)` |
/// | `GetInputList` | `sources = len(responseData.inputs)` |
/// | `GetStreamStatus` | `streaming = responseData.outputActive` |
/// | `GetRecordStatus` | `recording = responseData.outputActive` |
/// | `BroadcastCustomMessage` | none |
///
/// Missing fields leave the stat untouched. The control link is marked
/// `connected` afterwards, even when it was `authenticated`.
pub fn route_response(response: &RequestResponse, aggregator: &StatusAggregator) {
    if !response.is_success() {
        let status = response.request_status.as_ref();
        warn!(
            request_type = %response.request_type,
            request_id = %response.request_id,
            code = ?status.map(|s| s.code),
            comment = ?status.and_then(|s| s.comment.as_deref()),
            "Control server reported request failure"
        );
    }

    let update = match &response.request_type {
        RequestType::GetSceneList => response.array_len("scenes").map(ControlUpdate::Scenes),
        RequestType::GetInputList => response.array_len("inputs").map(ControlUpdate::Sources),
        RequestType::GetStreamStatus => response
            .get_bool("outputActive")
            .map(ControlUpdate::Streaming),
        RequestType::GetRecordStatus => response
            .get_bool("outputActive")
            .map(ControlUpdate::Recording),
        RequestType::BroadcastCustomMessage => {
            trace!(request_id = %response.request_id, "Broadcast acknowledged");
            None
        }
        RequestType::Other(name) => {
            debug!(request_type = %name, "Unhandled response type");
            None
        }
    };

    if let Some(update) = update {
        aggregator.apply_control(update);
    }

    aggregator.update_status(Endpoint::ControlLink, LinkStatus::Connected);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{Value, json};

    fn response(value: Value) -> RequestResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_scene_list_sets_scene_count() {
        let aggregator = StatusAggregator::new();
        route_response(
            &response(json!({
                "requestType": "GetSceneList",
                "requestId": "X",
                "responseData": { "scenes": ["a", "b", "c"] }
            })),
            &aggregator,
        );
        assert_eq!(aggregator.snapshot().obs_stats.scenes, 3);
    }

    #[test]
    fn test_input_and_output_status() {
        let aggregator = StatusAggregator::new();
        route_response(
            &response(json!({
                "requestType": "GetInputList",
                "requestId": "1",
                "responseData": { "inputs": [{}, {}] }
            })),
            &aggregator,
        );
        route_response(
            &response(json!({
                "requestType": "GetStreamStatus",
                "requestId": "2",
                "responseData": { "outputActive": true }
            })),
            &aggregator,
        );
        route_response(
            &response(json!({
                "requestType": "GetRecordStatus",
                "requestId": "3",
                "responseData": { "outputActive": true }
            })),
            &aggregator,
        );

        let stats = aggregator.snapshot().obs_stats;
        assert_eq!(stats.sources, 2);
        assert!(stats.streaming);
        assert!(stats.recording);
    }

    #[test]
    fn test_missing_payload_is_skipped() {
        let aggregator = StatusAggregator::new();
        aggregator.apply_control(ControlUpdate::Scenes(4));
        route_response(
            &response(json!({ "requestType": "GetSceneList", "requestId": "X" })),
            &aggregator,
        );
        route_response(
            &response(json!({
                "requestType": "GetStreamStatus",
                "requestId": "Y",
                "responseData": {}
            })),
            &aggregator,
        );

        let stats = aggregator.snapshot().obs_stats;
        assert_eq!(stats.scenes, 4);
        assert!(!stats.streaming);
    }

    #[test]
    fn test_response_downgrades_authenticated() {
        let aggregator = StatusAggregator::new();
        aggregator.update_status(Endpoint::ControlLink, LinkStatus::Authenticated);
        route_response(
            &response(json!({ "requestType": "BroadcastCustomMessage", "requestId": "b" })),
            &aggregator,
        );
        assert_eq!(
            aggregator.status(Endpoint::ControlLink),
            LinkStatus::Connected
        );
    }

    #[test]
    fn test_unknown_type_changes_nothing_but_status() {
        let aggregator = StatusAggregator::new();
        route_response(
            &response(json!({
                "requestType": "GetVersion",
                "requestId": "v",
                "responseData": { "scenes": [1] }
            })),
            &aggregator,
        );
        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot.obs_stats.scenes, 0);
        assert_eq!(
            snapshot.connection_status.control_link,
            LinkStatus::Connected
        );
    }
}
