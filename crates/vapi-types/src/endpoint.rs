//! HTTP methods and endpoint keys
//!
//! An endpoint key is the string `"METHOD path"` (method upper-cased, path as
//! declared in the OpenAPI document). It identifies one operation within a
//! sandbox and keys simulation definitions and simulation state.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// HTTP methods an OpenAPI path item may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// PUT
    Put,
    /// POST
    Post,
    /// DELETE
    Delete,
    /// OPTIONS
    Options,
    /// HEAD
    Head,
    /// PATCH
    Patch,
    /// TRACE
    Trace,
}

impl HttpMethod {
    /// All methods, in OpenAPI path-item order
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
        HttpMethod::Patch,
        HttpMethod::Trace,
    ];

    /// Upper-case wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
        }
    }

    /// Case-insensitive parse; `None` for anything that is not an HTTP method
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Endpoint key parse failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointKeyError {
    /// Key is not of the form `"METHOD path"`
    #[error("endpoint key must look like 'METHOD /path', got '{0}'")]
    Malformed(String),

    /// Method part is not an HTTP method
    #[error("unknown http method: '{0}'")]
    UnknownMethod(String),

    /// Path part does not start with '/'
    #[error("endpoint path must start with '/': '{0}'")]
    RelativePath(String),
}

/// `"METHOD path"` identifier of one operation within a sandbox
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EndpointKey {
    method: HttpMethod,
    path: String,
}

impl EndpointKey {
    /// Create endpoint key
    #[inline]
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }

    /// Method component
    #[inline]
    #[must_use]
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Path component, exactly as declared in the spec
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl std::fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

impl FromStr for EndpointKey {
    type Err = EndpointKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (method, path) = s
            .trim()
            .split_once(char::is_whitespace)
            .ok_or_else(|| EndpointKeyError::Malformed(s.to_string()))?;
        let method =
            HttpMethod::parse(method).ok_or_else(|| EndpointKeyError::UnknownMethod(method.to_string()))?;
        let path = path.trim();
        if !path.starts_with('/') {
            return Err(EndpointKeyError::RelativePath(path.to_string()));
        }
        Ok(Self::new(method, path))
    }
}

impl TryFrom<String> for EndpointKey {
    type Error = EndpointKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EndpointKey> for String {
    fn from(value: EndpointKey) -> Self {
        value.to_string()
    }
}
