//! Stored records

use crate::openapi::ValidatedSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use vapi_types::{HttpMethod, SandboxId};

/// Sandbox lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxState {
    /// Serving traffic
    Active,
    /// Created or paused
    #[default]
    Stopped,
    /// Simulation state and request log were wiped
    Reset,
}

impl SandboxState {
    /// Lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Stopped => "stopped",
            Self::Reset => "reset",
        }
    }
}

impl std::fmt::Display for SandboxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tenant's virtual API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxRecord {
    /// Sandbox id
    pub id: SandboxId,
    /// Display name
    pub name: String,
    /// Owning team
    pub team_id: String,
    /// Lifecycle state
    pub state: SandboxState,
    /// Current document, absent until first upload
    #[serde(default)]
    pub openapi_spec: Option<ValidatedSpec>,
    /// Bumped on every upload and state transition
    pub version: u64,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl SandboxRecord {
    /// New stopped sandbox at version 1
    #[must_use]
    pub fn new(name: impl Into<String>, team_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: SandboxId::new(),
            name: name.into(),
            team_id: team_id.into(),
            state: SandboxState::default(),
            openapi_spec: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Bump version and touch the update time
    pub fn bump(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

/// Input for a custom mock
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMock {
    /// Declared path (`/users/{id}`)
    #[serde(default)]
    pub path: String,
    /// HTTP method, any case
    #[serde(default)]
    pub method: String,
    /// Payload returned verbatim (or one element of, when randomized)
    #[serde(default)]
    pub response: Value,
    /// Pick a random element when `response` is an array
    #[serde(default)]
    pub is_randomized: bool,
    /// Artificial latency
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

impl NewMock {
    /// Create mock input
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>, response: Value) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            response,
            ..Self::default()
        }
    }

    /// With randomized array payload
    #[inline]
    #[must_use]
    pub fn randomized(mut self) -> Self {
        self.is_randomized = true;
        self
    }

    /// With artificial latency
    #[inline]
    #[must_use]
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }
}

/// Stored custom mock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockDefinition {
    /// Mock id, stable across overwrites
    pub id: Uuid,
    /// Owning sandbox
    pub sandbox_id: SandboxId,
    /// Declared path
    pub path: String,
    /// Method, stored upper-case
    pub method: HttpMethod,
    /// Payload
    pub response: Value,
    /// Pick a random element when `response` is an array
    pub is_randomized: bool,
    /// Artificial latency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}
