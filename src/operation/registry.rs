//! Operation Registry - Load operation definitions from JSON
//!
//! This module loads all service operation definitions from embedded JSON
//! files and provides lookup functions for the rest of the application.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Embedded operation JSON files (compiled into the binary)
const OPERATION_FILES: &[&str] = &[
    include_str!("../operations/directoryservice.json"),
    include_str!("../operations/dynamodb.json"),
    include_str!("../operations/logs.json"),
];

/// Service definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDef {
    pub display_name: String,
    /// Prefix of the `X-Amz-Target` header, e.g. `DynamoDB_20120810`
    pub target_prefix: String,
    /// Host label in the regional endpoint template
    pub endpoint_prefix: String,
}

/// Pagination tokens of a list operation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaginationDef {
    /// Request field carrying the cursor
    pub input_token: String,
    /// Response path of the next cursor
    pub output_token: String,
    /// Request field for the server-side page size hint
    #[serde(default)]
    pub limit_key: Option<String>,
    /// Response path of the per-page result collection
    pub items_path: String,
}

/// Operation definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct OperationDef {
    /// Operation name (the JSON map key)
    #[serde(skip)]
    pub name: String,
    pub service: String,
    /// Cmdlet-style alias, e.g. `Get-DDBTableList`
    #[serde(default)]
    pub cmdlet: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required_params: Vec<String>,
    #[serde(default)]
    pub pagination: Option<PaginationDef>,
    /// Default response field surfaced to the caller
    #[serde(default)]
    pub result_path: Option<String>,
    #[serde(skip)]
    pub target_prefix: String,
    #[serde(skip)]
    pub endpoint_prefix: String,
}

impl OperationDef {
    /// Build a definition by hand (registry entries are loaded from JSON)
    pub fn new(name: &str, target_prefix: &str, endpoint_prefix: &str) -> Self {
        Self {
            name: name.to_string(),
            service: endpoint_prefix.to_string(),
            cmdlet: None,
            description: String::new(),
            required_params: Vec::new(),
            pagination: None,
            result_path: None,
            target_prefix: target_prefix.to_string(),
            endpoint_prefix: endpoint_prefix.to_string(),
        }
    }

    pub fn with_pagination(mut self, pagination: PaginationDef) -> Self {
        if self.result_path.is_none() {
            self.result_path = Some(pagination.items_path.clone());
        }
        self.pagination = Some(pagination);
        self
    }

    pub fn with_required(mut self, params: &[&str]) -> Self {
        self.required_params = params.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Value of the `X-Amz-Target` header
    pub fn target(&self) -> String {
        format!("{}.{}", self.target_prefix, self.name)
    }

    pub fn is_paginated(&self) -> bool {
        self.pagination.is_some()
    }
}

impl PaginationDef {
    pub fn new(input_token: &str, output_token: &str, items_path: &str) -> Self {
        Self {
            input_token: input_token.to_string(),
            output_token: output_token.to_string(),
            limit_key: None,
            items_path: items_path.to_string(),
        }
    }

    pub fn with_limit_key(mut self, limit_key: &str) -> Self {
        self.limit_key = Some(limit_key.to_string());
        self
    }
}

/// Root structure of operations/*.json
#[derive(Debug, Clone, Deserialize)]
pub struct OperationConfig {
    #[serde(default)]
    pub services: HashMap<String, ServiceDef>,
    #[serde(default)]
    pub operations: HashMap<String, OperationDef>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<OperationConfig> = OnceLock::new();

/// Get the operation registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static OperationConfig {
    REGISTRY.get_or_init(|| {
        let mut final_config = OperationConfig {
            services: HashMap::new(),
            operations: HashMap::new(),
        };

        for content in OPERATION_FILES {
            let partial: OperationConfig = serde_json::from_str(content)
                .unwrap_or_else(|e| panic!("Failed to parse embedded operation JSON: {}", e));
            final_config.services.extend(partial.services);
            final_config.operations.extend(partial.operations);
        }

        for (name, operation) in final_config.operations.iter_mut() {
            let service = final_config
                .services
                .get(&operation.service)
                .unwrap_or_else(|| panic!("Operation {} references unknown service {}", name, operation.service));
            operation.name = name.clone();
            operation.target_prefix = service.target_prefix.clone();
            operation.endpoint_prefix = service.endpoint_prefix.clone();
            if operation.result_path.is_none() {
                operation.result_path = operation.pagination.as_ref().map(|p| p.items_path.clone());
            }
        }

        final_config
    })
}

/// Get an operation by name or cmdlet alias (case-insensitive)
pub fn get_operation(name: &str) -> Option<&'static OperationDef> {
    let registry = get_registry();
    if let Some(operation) = registry.operations.get(name) {
        return Some(operation);
    }

    registry.operations.values().find(|op| {
        op.name.eq_ignore_ascii_case(name)
            || op
                .cmdlet
                .as_deref()
                .map(|c| c.eq_ignore_ascii_case(name))
                .unwrap_or(false)
    })
}

/// Get a service by key
pub fn get_service(key: &str) -> Option<&'static ServiceDef> {
    get_registry().services.get(key)
}

/// All operations, sorted by service then name
pub fn list_operations(service: Option<&str>) -> Vec<&'static OperationDef> {
    let mut operations: Vec<&'static OperationDef> = get_registry()
        .operations
        .values()
        .filter(|op| service.map(|s| op.service == s).unwrap_or(true))
        .collect();
    operations.sort_by(|a, b| (&a.service, &a.name).cmp(&(&b.service, &b.name)));
    operations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_loads_successfully() {
        let registry = get_registry();
        assert!(
            !registry.operations.is_empty(),
            "Registry should have operations"
        );
        assert!(registry.services.contains_key("ds"));
    }

    #[test]
    fn test_describe_directories_exists() {
        let operation = get_operation("DescribeDirectories").expect("DescribeDirectories should exist");
        assert_eq!(operation.service, "ds");
        assert_eq!(operation.target(), "DirectoryService_20150416.DescribeDirectories");

        let pagination = operation.pagination.as_ref().expect("should paginate");
        assert_eq!(pagination.input_token, "NextToken");
        assert_eq!(pagination.limit_key.as_deref(), Some("Limit"));
        assert_eq!(operation.result_path.as_deref(), Some("DirectoryDescriptions"));
    }

    #[test]
    fn test_lookup_by_cmdlet_alias_ignores_case() {
        let operation = get_operation("get-ddbtablelist").expect("alias should resolve");
        assert_eq!(operation.name, "ListTables");
        let pagination = operation.pagination.as_ref().unwrap();
        assert_eq!(pagination.input_token, "ExclusiveStartTableName");
        assert_eq!(pagination.output_token, "LastEvaluatedTableName");
    }

    #[test]
    fn test_single_call_operations_have_no_pagination() {
        let operation = get_operation("CreateLogGroup").unwrap();
        assert!(!operation.is_paginated());
        assert_eq!(operation.required_params, vec!["logGroupName".to_string()]);
        assert!(operation.result_path.is_none());
    }

    #[test]
    fn test_list_operations_filters_by_service() {
        let logs = list_operations(Some("logs"));
        assert_eq!(logs.len(), 3);
        assert!(logs.iter().all(|op| op.service == "logs"));
        assert!(get_service("logs").is_some());
        assert!(get_operation("NoSuchOperation").is_none());
    }
}
