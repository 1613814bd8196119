//! Remote service interaction module
//!
//! This module provides everything that talks to the wire: the client seam
//! the invoker calls through, the HTTP implementation, and the error type
//! every invocation surfaces.
//!
//! # Module Structure
//!
//! - [`client`] - `RemoteClient` trait, explicit `ClientConfig`, HTTP client
//! - [`http`] - AWS JSON 1.1 POST helper and error parsing
//! - [`error`] - `CmdletError` taxonomy
//!
//! # Example
//!
//! ```ignore
//! use awscmd::remote::{ClientConfig, HttpRemoteClient};
//!
//! let client = HttpRemoteClient::new(ClientConfig::new(None, "us-east-1"))?;
//! ```

pub mod client;
pub mod error;
pub mod http;

pub use client::{ClientConfig, HttpRemoteClient, RemoteClient, DEFAULT_REGION, DEFAULT_TIMEOUT};
pub use error::CmdletError;
pub use http::format_cmdlet_error;
