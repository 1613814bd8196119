//! Output rendering

use crate::config::OutputFormat;
use anyhow::Result;
use serde_json::Value;

/// Render one output value (no trailing newline)
pub fn render_value(value: &Value, format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Jsonl => serde_json::to_string(value)?,
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(value)?;
            format!("---\n{}", yaml.trim_end())
        }
    };
    Ok(rendered)
}

/// Table of registered operations for `awscmd operations`
pub fn render_operation_table(operations: &[&crate::operation::OperationDef]) -> String {
    let name_width = operations
        .iter()
        .map(|op| op.name.len())
        .max()
        .unwrap_or(0)
        .max("OPERATION".len());
    let cmdlet_width = operations
        .iter()
        .map(|op| op.cmdlet.as_deref().unwrap_or("-").len())
        .max()
        .unwrap_or(0)
        .max("CMDLET".len());

    let mut out = format!(
        "{:<10} {:<name_width$} {:<cmdlet_width$} PAGINATED\n",
        "SERVICE", "OPERATION", "CMDLET"
    );
    for op in operations {
        out.push_str(&format!(
            "{:<10} {:<name_width$} {:<cmdlet_width$} {}\n",
            op.service,
            op.name,
            op.cmdlet.as_deref().unwrap_or("-"),
            if op.is_paginated() { "yes" } else { "no" }
        ));
    }
    out
}
