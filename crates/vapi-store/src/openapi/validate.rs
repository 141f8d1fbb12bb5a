use super::refs::resolve_refs;
use super::{response_schema, ValidatedSpec, NON_OPERATION_KEYS};
use crate::error::InvalidSpecError;
use jsonschema::{Draft, JSONSchema};
use serde_json::{json, Map, Value};
use vapi_types::HttpMethod;

/// Document family, decides the JSON Schema draft used for response schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Swagger2,
    OpenApi30,
    OpenApi31,
}

impl Dialect {
    fn draft(self) -> Draft {
        match self {
            Self::Swagger2 | Self::OpenApi30 => Draft::Draft4,
            Self::OpenApi31 => Draft::Draft7,
        }
    }
}

/// Validate an OpenAPI 3.x (or Swagger 2.0) document
///
/// # Checks
/// - `openapi` is a `3.x` version string, or `swagger` is `"2.0"`
/// - `info.title` and `info.version` are strings
/// - `paths` is an object whose keys start with `/`
/// - path item keys are HTTP methods, non-operation keys or `x-` extensions
/// - every operation is an object with a `responses` object
/// - internal references resolve; external ones are rejected
/// - every response schema compiles as a JSON Schema
///
/// The returned document has its references inlined; circular ones are kept
/// as `$ref` nodes.
///
/// # Errors
/// [`InvalidSpecError`] naming the first failed check.
pub fn validate_spec(document: &Value) -> Result<ValidatedSpec, InvalidSpecError> {
    let root = document
        .as_object()
        .ok_or_else(|| InvalidSpecError::new("document must be a JSON object"))?;
    let dialect = check_version(root)?;
    check_info(root)?;
    if !root.get("paths").is_some_and(Value::is_object) {
        return Err(InvalidSpecError::new("'paths' must be an object"));
    }

    let resolved = resolve_refs(document)?;
    check_paths(&resolved)?;
    check_response_schemas(&resolved, dialect)?;
    Ok(ValidatedSpec::from_resolved(resolved))
}

fn check_version(root: &Map<String, Value>) -> Result<Dialect, InvalidSpecError> {
    if let Some(version) = root.get("openapi") {
        let version = version
            .as_str()
            .ok_or_else(|| InvalidSpecError::new("'openapi' must be a version string"))?;
        let mut parts = version.split('.');
        let major = parts.next();
        let minor = parts.next();
        let well_formed = major == Some("3")
            && minor.is_some_and(|m| !m.is_empty() && m.bytes().all(|b| b.is_ascii_digit()));
        if !well_formed {
            return Err(InvalidSpecError::new(format!(
                "unsupported OpenAPI version '{version}', expected 3.x"
            )));
        }
        return Ok(if minor == Some("0") {
            Dialect::OpenApi30
        } else {
            Dialect::OpenApi31
        });
    }
    match root.get("swagger").and_then(Value::as_str) {
        Some("2.0") => Ok(Dialect::Swagger2),
        Some(other) => Err(InvalidSpecError::new(format!(
            "unsupported Swagger version '{other}', expected 2.0"
        ))),
        None => Err(InvalidSpecError::new(
            "missing 'openapi' (3.x) or 'swagger' (2.0) version field",
        )),
    }
}

fn check_info(root: &Map<String, Value>) -> Result<(), InvalidSpecError> {
    let info = root
        .get("info")
        .and_then(Value::as_object)
        .ok_or_else(|| InvalidSpecError::new("'info' must be an object"))?;
    for field in ["title", "version"] {
        if !info.get(field).is_some_and(Value::is_string) {
            return Err(InvalidSpecError::new(format!("'info.{field}' must be a string")));
        }
    }
    Ok(())
}

fn check_paths(resolved: &Value) -> Result<(), InvalidSpecError> {
    let Some(paths) = resolved.get("paths").and_then(Value::as_object) else {
        return Err(InvalidSpecError::new("'paths' must be an object"));
    };
    for (path, item) in paths {
        if !path.starts_with('/') {
            return Err(InvalidSpecError::new(format!("path '{path}' must start with '/'")));
        }
        let item = item
            .as_object()
            .ok_or_else(|| InvalidSpecError::new(format!("path item '{path}' must be an object")))?;
        for (key, operation) in item {
            if NON_OPERATION_KEYS.contains(&key.as_str()) || key.starts_with("x-") {
                continue;
            }
            if HttpMethod::parse(key).is_none() {
                return Err(InvalidSpecError::new(format!(
                    "unexpected key '{key}' in path item '{path}'"
                )));
            }
            let has_responses = operation
                .as_object()
                .and_then(|op| op.get("responses"))
                .is_some_and(Value::is_object);
            if !has_responses {
                return Err(InvalidSpecError::new(format!(
                    "operation {} {path} must have a 'responses' object",
                    key.to_ascii_uppercase()
                )));
            }
        }
    }
    Ok(())
}

fn check_response_schemas(resolved: &Value, dialect: Dialect) -> Result<(), InvalidSpecError> {
    let Some(paths) = resolved.get("paths").and_then(Value::as_object) else {
        return Ok(());
    };
    for (path, item) in paths {
        let Some(item) = item.as_object() else {
            continue;
        };
        for (key, operation) in item {
            if HttpMethod::parse(key).is_none() {
                continue;
            }
            let Some(responses) = operation.get("responses").and_then(Value::as_object) else {
                continue;
            };
            for (status, response) in responses {
                let schemas: Vec<&Value> = match response.get("content").and_then(Value::as_object) {
                    Some(content) => content.values().filter_map(|media| media.get("schema")).collect(),
                    None => response_schema(response).into_iter().collect(),
                };
                for schema in schemas {
                    compile(resolved, schema, dialect).map_err(|reason| {
                        InvalidSpecError::new(format!(
                            "response {status} of {} {path} has an invalid schema: {reason}",
                            key.to_ascii_uppercase()
                        ))
                    })?;
                }
            }
        }
    }
    Ok(())
}

/// Compile one schema with the document's component sections alongside it,
/// so circular references left as `$ref` still resolve
fn compile(resolved: &Value, schema: &Value, dialect: Dialect) -> Result<(), String> {
    if !(schema.is_object() || schema.is_boolean()) {
        return Err("schema must be an object".to_string());
    }
    let mut wrapper = json!({ "allOf": [schema] });
    for section in ["components", "definitions"] {
        if let Some(value) = resolved.get(section) {
            wrapper[section] = value.clone();
        }
    }
    JSONSchema::options()
        .with_draft(dialect.draft())
        .compile(&wrapper)
        .map(|_| ())
        .map_err(|e| e.to_string())
}
