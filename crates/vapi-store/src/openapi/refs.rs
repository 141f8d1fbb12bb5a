//! Internal `$ref` resolution

use crate::error::InvalidSpecError;
use serde_json::{Map, Value};

/// Deepest chain of nested reference expansions
const MAX_REF_CHAIN: usize = 64;

/// Most JSON nodes the inlined document may contain
pub(crate) const MAX_RESOLVED_NODES: usize = 500_000;

/// Inline every internal reference of `root`
///
/// A reference that points back into a chain currently being expanded is left
/// untouched as a `$ref` node. External references (anything not starting with
/// `#`) and dangling pointers are errors, and so is a document whose inlined
/// form exceeds [`MAX_RESOLVED_NODES`].
pub(crate) fn resolve_refs(root: &Value) -> Result<Value, InvalidSpecError> {
    Resolver {
        root,
        chain: Vec::new(),
        budget: MAX_RESOLVED_NODES,
    }
    .resolve(root)
}

struct Resolver<'a> {
    root: &'a Value,
    chain: Vec<String>,
    budget: usize,
}

impl Resolver<'_> {
    fn resolve(&mut self, node: &Value) -> Result<Value, InvalidSpecError> {
        self.budget = self.budget.checked_sub(1).ok_or_else(|| {
            InvalidSpecError::new(format!(
                "document expands to more than {MAX_RESOLVED_NODES} nodes once references are inlined"
            ))
        })?;
        match node {
            Value::Object(map) => {
                if let Some(reference) = map.get("$ref") {
                    return self.expand(node, reference);
                }
                let mut out = Map::with_capacity(map.len());
                for (key, value) in map {
                    out.insert(key.clone(), self.resolve(value)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    fn expand(&mut self, node: &Value, reference: &Value) -> Result<Value, InvalidSpecError> {
        let reference = reference
            .as_str()
            .ok_or_else(|| InvalidSpecError::new("$ref must be a string"))?;
        let pointer = reference.strip_prefix('#').ok_or_else(|| {
            InvalidSpecError::new(format!("external reference '{reference}' is not supported"))
        })?;
        if !pointer.is_empty() && !pointer.starts_with('/') {
            return Err(InvalidSpecError::new(format!(
                "reference '{reference}' is not a JSON pointer"
            )));
        }

        if self.chain.iter().any(|seen| seen == pointer) {
            return Ok(node.clone());
        }
        if self.chain.len() >= MAX_REF_CHAIN {
            return Err(InvalidSpecError::new(format!(
                "reference chain through '{reference}' is nested too deeply"
            )));
        }

        let root = self.root;
        let target = root
            .pointer(pointer)
            .ok_or_else(|| InvalidSpecError::new(format!("cannot resolve reference '{reference}'")))?;
        self.chain.push(pointer.to_string());
        let resolved = self.resolve(target);
        self.chain.pop();
        resolved
    }
}
