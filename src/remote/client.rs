//! Remote Operation Client
//!
//! The one collaborator the invoker talks to. `RemoteClient` is the seam;
//! `HttpRemoteClient` speaks the AWS JSON 1.1 wire shape, and tests plug in
//! scripted stubs.

use super::error::CmdletError;
use super::http::AwsJsonHttpClient;
use crate::operation::{OperationDef, OperationRequest};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use url::Url;

/// Default region when nothing else is configured
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One callable per operation: `(request) -> response | error`
pub trait RemoteClient {
    fn invoke(
        &self,
        operation: &OperationDef,
        request: &OperationRequest,
    ) -> impl Future<Output = Result<Value, CmdletError>>;
}

/// Explicit client configuration, passed in rather than read from ambient state
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Fixed endpoint for every service; `None` uses the regional template
    pub endpoint: Option<String>,
    pub region: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: DEFAULT_REGION.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn new(endpoint: Option<String>, region: &str) -> Self {
        Self {
            endpoint,
            region: region.to_string(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Endpoint URL for an operation's service
    pub fn endpoint_for(&self, operation: &OperationDef) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!(
                "https://{}.{}.amazonaws.com/",
                operation.endpoint_prefix, self.region
            ),
        }
    }
}

/// Remote client over HTTP
#[derive(Clone)]
pub struct HttpRemoteClient {
    pub config: ClientConfig,
    pub http: AwsJsonHttpClient,
}

impl HttpRemoteClient {
    /// Create a new client, validating the configured endpoint
    pub fn new(config: ClientConfig) -> Result<Self, CmdletError> {
        if let Some(endpoint) = &config.endpoint {
            let url = Url::parse(endpoint)
                .map_err(|e| CmdletError::invalid("endpoint", e.to_string()))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(CmdletError::invalid(
                    "endpoint",
                    format!("unsupported scheme '{}'", url.scheme()),
                ));
            }
        }

        let http = AwsJsonHttpClient::new(config.timeout)?;

        Ok(Self { config, http })
    }

    pub fn region(&self) -> &str {
        &self.config.region
    }
}

impl RemoteClient for HttpRemoteClient {
    async fn invoke(
        &self,
        operation: &OperationDef,
        request: &OperationRequest,
    ) -> Result<Value, CmdletError> {
        let endpoint = self.config.endpoint_for(operation);
        self.http
            .post(&endpoint, &operation.target(), &request.to_body())
            .await
    }
}
