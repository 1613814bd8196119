//! Select projection
//!
//! Chooses which part of a response is surfaced to the caller. Applied once
//! the invocation has its final response; it never changes how many calls
//! are made.

use super::registry::OperationDef;
use super::request::OperationRequest;
use crate::remote::CmdletError;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Select {
    /// `*` - the whole response
    Response,
    /// A dot path into the response, e.g. `Table.KeySchema`
    Field(String),
    /// `^Name` - echo a bound input parameter back
    Param(String),
}

impl Select {
    /// Default projection: the operation's result field, else the whole response
    pub fn default_for(operation: &OperationDef) -> Self {
        match &operation.result_path {
            Some(path) => Self::Field(path.clone()),
            None => Self::Response,
        }
    }

    pub fn apply(&self, response: &Value, request: &OperationRequest) -> Value {
        match self {
            Self::Response => response.clone(),
            Self::Field(path) => lookup_path(response, path).cloned().unwrap_or(Value::Null),
            Self::Param(name) => request.get(name).cloned().unwrap_or(Value::Null),
        }
    }
}

impl FromStr for Select {
    type Err = CmdletError;

    fn from_str(expr: &str) -> Result<Self, Self::Err> {
        let expr = expr.trim();
        match expr {
            "" => Err(CmdletError::invalid("select", "empty expression")),
            "*" => Ok(Self::Response),
            _ => match expr.strip_prefix('^') {
                Some("") => Err(CmdletError::invalid("select", "missing parameter name after '^'")),
                Some(name) => Ok(Self::Param(name.to_string())),
                None => Ok(Self::Field(expr.to_string())),
            },
        }
    }
}

impl fmt::Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Response => write!(f, "*"),
            Self::Field(path) => write!(f, "{}", path),
            Self::Param(name) => write!(f, "^{}", name),
        }
    }
}

/// Walk a dot-notation path; numeric segments index into arrays
pub fn lookup_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    if path.is_empty() {
        return Some(value);
    }

    let mut current = value;
    for part in path.split('.') {
        current = match (current, part.parse::<usize>()) {
            (Value::Array(arr), Ok(idx)) => arr.get(idx)?,
            _ => current.get(part)?,
        };
    }
    Some(current)
}
