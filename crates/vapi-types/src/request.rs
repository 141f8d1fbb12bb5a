//! Request and tenant context types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fallback user identifier when neither the body nor the tenant names one
pub const UNKNOWN_USER: &str = "unknown";

/// Verified tenant identity delivered by the upstream gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantContext {
    /// Owning team
    pub team_id: String,
    /// Calling user, if the gateway knows one
    pub user_id: Option<String>,
    /// Role name as issued upstream; trusted, never re-checked
    pub role: Option<String>,
}

impl TenantContext {
    /// Create context for a team
    #[inline]
    #[must_use]
    pub fn new(team_id: impl Into<String>) -> Self {
        Self {
            team_id: team_id.into(),
            user_id: None,
            role: None,
        }
    }

    /// With user id
    #[inline]
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// With role
    #[inline]
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

/// One inbound request against a live mock route
///
/// `params` holds the values bound to `{name}` path template segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MockRequest {
    /// Parsed JSON body (`Null` when absent or not JSON)
    pub body: Value,
    /// Query string parameters
    pub query: Map<String, Value>,
    /// Path template parameters
    pub params: Map<String, Value>,
    /// User id from the tenant context, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl MockRequest {
    /// Create request with a JSON body
    #[inline]
    #[must_use]
    pub fn with_body(body: Value) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }

    /// With tenant user id
    #[inline]
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// User a simulation should key its state by
    ///
    /// `body.userId` wins, then the tenant user, then [`UNKNOWN_USER`].
    #[must_use]
    pub fn requesting_user(&self) -> &str {
        self.body
            .get("userId")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or(self.user_id.as_deref())
            .unwrap_or(UNKNOWN_USER)
    }

    /// Body field lookup
    #[inline]
    #[must_use]
    pub fn body_field(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requesting_user_prefers_body() {
        let req = MockRequest::with_body(json!({"userId": "alice"})).with_user("bob");
        assert_eq!(req.requesting_user(), "alice");
    }

    #[test]
    fn requesting_user_falls_back_to_tenant() {
        let req = MockRequest::with_body(json!({"amount": 5})).with_user("bob");
        assert_eq!(req.requesting_user(), "bob");
    }

    #[test]
    fn requesting_user_defaults_to_unknown() {
        let req = MockRequest::default();
        assert_eq!(req.requesting_user(), UNKNOWN_USER);
    }

    #[test]
    fn tenant_context_builder() {
        let ctx = TenantContext::new("team-1").with_user("u1").with_role("admin");
        assert_eq!(ctx.team_id, "team-1");
        assert_eq!(ctx.user_id.as_deref(), Some("u1"));
        assert_eq!(ctx.role.as_deref(), Some("admin"));
    }
}
