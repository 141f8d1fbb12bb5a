//! OpenAPI documents
//!
//! - [`validate_spec`]: structural validation with internal `$ref` inlining
//! - [`ValidatedSpec`]: a document that passed validation, with its operations
//!   indexed for routing and mock generation

mod refs;
mod validate;

pub use validate::validate_spec;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use vapi_types::{EndpointKey, HttpMethod};

/// Path item keys that are not operations
pub const NON_OPERATION_KEYS: [&str; 5] = ["summary", "description", "parameters", "servers", "$ref"];

/// One `(path, method)` pair of a document
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// HTTP method
    pub method: HttpMethod,
    /// Path template as declared (`/users/{id}`)
    pub path: String,
    /// `application/json` schema of the `200` (else `default`) response
    pub response_schema: Option<Value>,
}

impl Operation {
    /// Endpoint key `METHOD path`
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> EndpointKey {
        EndpointKey::new(self.method, self.path.clone())
    }
}

/// OpenAPI document that passed [`validate_spec`]
///
/// References are already inlined. Serializes as the bare document.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSpec {
    document: Value,
    operations: Vec<Operation>,
}

impl ValidatedSpec {
    /// Index a document that is already validated and resolved
    ///
    /// Used when loading stored documents; unknown shapes are skipped rather
    /// than rejected.
    #[must_use]
    pub fn from_resolved(document: Value) -> Self {
        let operations = collect_operations(&document);
        Self {
            document,
            operations,
        }
    }

    /// Resolved document
    #[inline]
    #[must_use]
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Consume into the resolved document
    #[inline]
    #[must_use]
    pub fn into_document(self) -> Value {
        self.document
    }

    /// All operations in declaration order
    #[inline]
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Operation by method and declared path
    #[must_use]
    pub fn operation(&self, method: HttpMethod, path: &str) -> Option<&Operation> {
        self.operations
            .iter()
            .find(|op| op.method == method && op.path == path)
    }

    /// `info.title`
    #[must_use]
    pub fn title(&self) -> &str {
        self.document
            .pointer("/info/title")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// `info.version`
    #[must_use]
    pub fn version(&self) -> &str {
        self.document
            .pointer("/info/version")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

impl Serialize for ValidatedSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.document.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ValidatedSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_resolved)
    }
}

fn collect_operations(document: &Value) -> Vec<Operation> {
    let Some(paths) = document.get("paths").and_then(Value::as_object) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for (path, item) in paths {
        let Some(item) = item.as_object() else {
            continue;
        };
        for (key, operation) in item {
            let Some(method) = HttpMethod::parse(key) else {
                continue;
            };
            out.push(Operation {
                method,
                path: path.clone(),
                response_schema: operation
                    .get("responses")
                    .and_then(Value::as_object)
                    .and_then(success_schema),
            });
        }
    }
    out
}

/// `200` response, else `default`, reduced to its JSON schema
fn success_schema(responses: &Map<String, Value>) -> Option<Value> {
    let response = responses.get("200").or_else(|| responses.get("default"))?;
    response_schema(response).cloned()
}

/// JSON schema of one response object
///
/// OpenAPI 3 nests it under `content["application/json"].schema`; Swagger 2
/// keeps it directly under `schema`.
pub(crate) fn response_schema(response: &Value) -> Option<&Value> {
    match response.get("content") {
        Some(content) => content.get("application/json")?.get("schema"),
        None => response.get("schema"),
    }
}
