use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use vapi_types::{EndpointKey, MockRequest};

/// Which pipeline stage produced a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    /// Simulation plugin or literal scenario
    Simulation,
    /// Explicit mock definition
    CustomMock,
    /// Generated from the OpenAPI response schema
    Schema,
    /// `No mock defined` body; the operation declares no response schema
    Placeholder,
}

impl ResponseSource {
    /// Stable label used in logs
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Simulation => "simulation",
            ResponseSource::CustomMock => "custom_mock",
            ResponseSource::Schema => "schema",
            ResponseSource::Placeholder => "placeholder",
        }
    }
}

/// Request inputs as recorded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    /// Request body
    pub body: Value,
    /// Query string parameters
    pub query: Map<String, Value>,
    /// Path template parameters
    pub params: Map<String, Value>,
}

impl From<&MockRequest> for RequestSnapshot {
    fn from(req: &MockRequest) -> Self {
        Self {
            body: req.body.clone(),
            query: req.query.clone(),
            params: req.params.clone(),
        }
    }
}

/// Immutable record of one resolved request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedRequest {
    /// `"METHOD path"` of the matched operation
    pub endpoint: EndpointKey,
    /// Request inputs
    pub request: RequestSnapshot,
    /// Response that was returned
    pub response: Value,
    /// Stage that produced the response
    pub source: ResponseSource,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl RecordedRequest {
    /// Create entry stamped with the current time
    #[must_use]
    pub fn now(endpoint: EndpointKey, request: &MockRequest, response: Value, source: ResponseSource) -> Self {
        Self {
            endpoint,
            request: RequestSnapshot::from(request),
            response,
            source,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}
