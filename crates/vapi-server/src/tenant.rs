//! Tenant context from trusted upstream headers
//!
//! Identity is verified upstream; this layer only reads `x-team-id`,
//! `x-user-id` and `x-role`.

use crate::error::ApiError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use vapi_types::TenantContext;

/// Team header, required on management routes
pub const TEAM_HEADER: &str = "x-team-id";
/// Acting user header
pub const USER_HEADER: &str = "x-user-id";
/// Role header
pub const ROLE_HEADER: &str = "x-role";

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Acting user, if the caller named one
#[must_use]
pub fn user_from_headers(headers: &HeaderMap) -> Option<String> {
    header(headers, USER_HEADER)
}

/// Tenant context from request headers
///
/// # Errors
/// [`ApiError::Unauthorized`] when the team header is missing or empty.
pub fn tenant_from_headers(headers: &HeaderMap) -> Result<TenantContext, ApiError> {
    let team = header(headers, TEAM_HEADER)
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {TEAM_HEADER} header")))?;
    let mut tenant = TenantContext::new(team);
    if let Some(user) = user_from_headers(headers) {
        tenant = tenant.with_user(user);
    }
    if let Some(role) = header(headers, ROLE_HEADER) {
        tenant = tenant.with_role(role);
    }
    Ok(tenant)
}

/// Extractor for the caller's tenant context
#[derive(Debug, Clone)]
pub struct Tenant(pub TenantContext);

impl<S> FromRequestParts<S> for Tenant
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        tenant_from_headers(&parts.headers).map(Tenant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_all_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(TEAM_HEADER, HeaderValue::from_static("team-a"));
        headers.insert(USER_HEADER, HeaderValue::from_static("alice"));
        headers.insert(ROLE_HEADER, HeaderValue::from_static("developer"));
        let tenant = tenant_from_headers(&headers).unwrap();
        assert_eq!(tenant.team_id, "team-a");
        assert_eq!(tenant.user_id.as_deref(), Some("alice"));
        assert_eq!(tenant.role.as_deref(), Some("developer"));
    }

    #[test]
    fn missing_or_blank_team_is_unauthorized() {
        let mut headers = HeaderMap::new();
        assert!(matches!(tenant_from_headers(&headers), Err(ApiError::Unauthorized(_))));
        headers.insert(TEAM_HEADER, HeaderValue::from_static("  "));
        assert!(matches!(tenant_from_headers(&headers), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn user_is_optional() {
        let mut headers = HeaderMap::new();
        headers.insert(TEAM_HEADER, HeaderValue::from_static("t"));
        assert!(tenant_from_headers(&headers).unwrap().user_id.is_none());
        assert!(user_from_headers(&headers).is_none());
    }
}
