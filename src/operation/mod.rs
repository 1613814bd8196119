//! Operation abstraction layer
//!
//! This module provides a data-driven approach to invoking remote service
//! operations. Operation definitions are loaded from JSON files at compile
//! time, so new operations can be added without code changes.
//!
//! # Architecture
//!
//! - [`registry`] - Loads and caches operation definitions from embedded JSON
//! - [`request`] - Builds requests from sparse caller input
//! - [`pager`] - Drives list operations page by page
//! - [`select`] - Projects the response surfaced to the caller
//! - [`dispatch`] - Validates, calls or paginates, and emits output
//!
//! # Operation Definitions
//!
//! Operations are defined in JSON files under `src/operations/`:
//! - `directoryservice.json` - AWS Directory Service
//! - `dynamodb.json` - Amazon DynamoDB
//! - `logs.json` - Amazon CloudWatch Logs
//!
//! # Example
//!
//! ```ignore
//! use awscmd::operation::{invoke_operation, OperationRequest, PagingOptions};
//!
//! let outcome = invoke_operation(
//!     &client,
//!     "DescribeDirectories",
//!     OperationRequest::new(),
//!     &PagingOptions::default(),
//!     None,
//!     &cancel,
//!     |item| println!("{item}"),
//! )
//! .await?;
//! ```

pub mod dispatch;
pub mod pager;
pub mod registry;
pub mod request;
pub mod select;

pub use dispatch::{invoke_operation, invoke_with, InvocationOutcome};
pub use pager::{invoke_paginated, PageOutcome, Pager, PagerState, PagingOptions};
pub use registry::{
    get_operation, get_registry, get_service, list_operations, OperationDef, PaginationDef,
    ServiceDef,
};
pub use request::{parse_param_value, OperationRequest, RequestBuilder};
pub use select::Select;
