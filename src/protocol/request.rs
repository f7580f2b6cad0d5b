//! Request and RequestResponse message types.
//!
//! Defines the RPC payloads exchanged after identification.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

// ============================================================================
// RequestType
// ============================================================================

/// Request kinds the relay issues or recognizes in responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestType {
    /// Lists scenes.
    GetSceneList,
    /// Lists inputs (sources).
    GetInputList,
    /// Streaming output state.
    GetStreamStatus,
    /// Recording output state.
    GetRecordStatus,
    /// Emits a custom event to all subscribed clients.
    BroadcastCustomMessage,
    /// Anything else, kept verbatim.
    Other(String),
}

impl RequestType {
    /// The four status queries issued after identification.
    pub const STATUS_QUERIES: [Self; 4] = [
        Self::GetSceneList,
        Self::GetInputList,
        Self::GetStreamStatus,
        Self::GetRecordStatus,
    ];

    /// Returns the wire name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::GetSceneList => "GetSceneList",
            Self::GetInputList => "GetInputList",
            Self::GetStreamStatus => "GetStreamStatus",
            Self::GetRecordStatus => "GetRecordStatus",
            Self::BroadcastCustomMessage => "BroadcastCustomMessage",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for RequestType {
    fn from(value: &str) -> Self {
        match value {
            "GetSceneList" => Self::GetSceneList,
            "GetInputList" => Self::GetInputList,
            "GetStreamStatus" => Self::GetStreamStatus,
            "GetRecordStatus" => Self::GetRecordStatus,
            "BroadcastCustomMessage" => Self::BroadcastCustomMessage,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for RequestType {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<RequestType> for String {
    fn from(value: RequestType) -> Self {
        match value {
            RequestType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Request
// ============================================================================

/// An RPC request from relay to control server.
///
/// # Format
///
/// ```json
/// {
///   "op": 6,
///   "d": {
///     "requestType": "GetSceneList",
///     "requestId": "f1c2...",
///     ...requestData
///   }
/// }
/// ```
///
/// Keys of the caller's request data are merged into `d`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Request kind.
    pub request_type: RequestType,

    /// Correlation id.
    pub request_id: RequestId,

    /// Extra fields merged into the payload.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Request {
    /// Creates a request without extra fields.
    #[inline]
    #[must_use]
    pub fn new(request_type: RequestType, request_id: RequestId) -> Self {
        Self {
            request_type,
            request_id,
            fields: Map::new(),
        }
    }

    /// Creates a request merging `data` into the payload.
    ///
    /// `requestType` and `requestId` keys in `data` are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if `data` is neither an object nor null.
    pub fn with_data(
        request_type: RequestType,
        request_id: RequestId,
        data: Option<Value>,
    ) -> Result<Self> {
        let mut fields = match data {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(Error::protocol(format!(
                    "request data must be a JSON object, got {other}"
                )));
            }
        };
        fields.remove("requestType");
        fields.remove("requestId");

        Ok(Self {
            request_type,
            request_id,
            fields,
        })
    }
}

// ============================================================================
// RequestResponse
// ============================================================================

/// Outcome block attached to each response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RequestStatus {
    /// Whether the request succeeded.
    pub result: bool,
    /// Server status code.
    #[serde(default)]
    pub code: u32,
    /// Human-readable detail on failure.
    #[serde(default)]
    pub comment: Option<String>,
}

/// An RPC response from control server to relay.
///
/// # Format
///
/// ```json
/// {
///   "op": 7,
///   "d": {
///     "requestType": "GetSceneList",
///     "requestId": "f1c2...",
///     "requestStatus": { "result": true, "code": 100 },
///     "responseData": { "scenes": [] }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestResponse {
    /// Matches the request's type.
    pub request_type: RequestType,

    /// Matches the request's id.
    pub request_id: RequestId,

    /// Success or failure details.
    #[serde(default)]
    pub request_status: Option<RequestStatus>,

    /// Response payload.
    #[serde(default)]
    pub response_data: Option<Value>,
}

impl RequestResponse {
    /// Returns `false` only if the server reported a failure.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.request_status.as_ref().is_none_or(|s| s.result)
    }

    /// Gets a field of `responseData`.
    #[inline]
    #[must_use]
    pub fn data_field(&self, key: &str) -> Option<&Value> {
        self.response_data.as_ref().and_then(|v| v.get(key))
    }

    /// Length of an array field in `responseData`.
    #[inline]
    #[must_use]
    pub fn array_len(&self, key: &str) -> Option<u64> {
        self.data_field(key)
            .and_then(Value::as_array)
            .map(|items| items.len() as u64)
    }

    /// Boolean field in `responseData`.
    #[inline]
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.data_field(key).and_then(Value::as_bool)
    }
}

// ============================================================================
// Tests
// ============================================================================
