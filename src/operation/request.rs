//! Operation requests
//!
//! A request is a sparse set of named parameters mapped onto an operation's
//! fixed schema. The builder skips absent values and flattens dotted keys
//! (`Filter.Name=x`) into nested structures.

use super::registry::OperationDef;
use crate::remote::CmdletError;
use serde_json::{Map, Value};

/// Request parameters for one invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationRequest {
    params: Map<String, Value>,
}

impl OperationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// Set a top-level parameter in place
    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        self.params.insert(name.to_string(), value.into());
    }

    /// Request body sent on the wire
    pub fn to_body(&self) -> Value {
        Value::Object(self.params.clone())
    }

    /// Overwrite the continuation cursor; an empty cursor removes the field
    pub fn set_cursor(&mut self, field: &str, cursor: Option<&str>) {
        match cursor {
            Some(token) if !token.is_empty() => {
                self.params.insert(field.to_string(), Value::String(token.to_string()));
            }
            _ => {
                self.params.remove(field);
            }
        }
    }

    /// Check that every required parameter is present and not null
    pub fn validate(&self, operation: &OperationDef) -> Result<(), CmdletError> {
        for name in &operation.required_params {
            match self.params.get(name) {
                None | Some(Value::Null) => return Err(CmdletError::missing(name)),
                Some(Value::String(s)) if s.is_empty() => return Err(CmdletError::missing(name)),
                _ => {}
            }
        }
        Ok(())
    }
}

/// Builder for [`OperationRequest`]
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    params: Map<String, Value>,
}

impl RequestBuilder {
    /// Set a top-level parameter
    pub fn param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Set a top-level parameter only when a value was supplied
    pub fn param_opt<T: Into<Value>>(self, name: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.param(name, v),
            None => self,
        }
    }

    /// Set a possibly nested parameter by dotted path
    ///
    /// Setting the same path twice accumulates the values into a list.
    pub fn path(mut self, path: &str, value: Value) -> Result<Self, CmdletError> {
        insert_path(&mut self.params, path, value)?;
        Ok(self)
    }

    /// Apply a `Key=Value` assignment from the command line
    pub fn assign(self, assignment: &str) -> Result<Self, CmdletError> {
        let Some((key, raw)) = assignment.split_once('=') else {
            return Err(CmdletError::invalid(
                assignment,
                "expected Key=Value",
            ));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(CmdletError::invalid(assignment, "empty parameter name"));
        }
        self.path(key, parse_param_value(raw))
    }

    pub fn build(self) -> OperationRequest {
        OperationRequest {
            params: self.params,
        }
    }
}

/// Parse a command-line value: JSON when it parses, a plain string otherwise
pub fn parse_param_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn insert_path(root: &mut Map<String, Value>, path: &str, value: Value) -> Result<(), CmdletError> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(CmdletError::invalid(path, "empty segment in parameter path"));
    }

    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| CmdletError::invalid(path, "empty parameter path"))?;

    let mut current = root;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match entry {
            Value::Object(map) => map,
            _ => {
                return Err(CmdletError::invalid(
                    path,
                    format!("'{}' is already set to a non-structure value", segment),
                ))
            }
        };
    }

    match current.get_mut(*last) {
        None => {
            current.insert(last.to_string(), value);
        }
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let previous = existing.take();
            *existing = Value::Array(vec![previous, value]);
        }
    }

    Ok(())
}
