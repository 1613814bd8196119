//! HTTP utilities for AWS JSON 1.1 API calls

use super::error::CmdletError;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Content type of the AWS JSON 1.1 protocol
pub const AMZ_JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Header carrying `<TargetPrefix>.<Operation>`
pub const AMZ_TARGET_HEADER: &str = "X-Amz-Target";

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client wrapper for JSON-protocol service calls
#[derive(Clone)]
pub struct AwsJsonHttpClient {
    client: Client,
}

impl AwsJsonHttpClient {
    /// Create a new HTTP client with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self, CmdletError> {
        let client = Client::builder()
            .user_agent(concat!("awscmd/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(CmdletError::Transport)?;

        Ok(Self { client })
    }

    /// POST one operation call and parse the JSON reply
    pub async fn post(&self, endpoint: &str, target: &str, body: &Value) -> Result<Value, CmdletError> {
        tracing::debug!("POST {} ({})", endpoint, target);

        let response = self
            .client
            .post(endpoint)
            .header(AMZ_TARGET_HEADER, target)
            .header(reqwest::header::CONTENT_TYPE, AMZ_JSON_CONTENT_TYPE)
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| classify_send_error(endpoint, e))?;

        let status = response.status();
        let error_type_header = response
            .headers()
            .get("x-amzn-ErrorType")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let response_body = response.text().await.map_err(CmdletError::Transport)?;

        if !status.is_success() {
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&response_body));
            return Err(parse_service_error(
                status.as_u16(),
                error_type_header.as_deref(),
                &response_body,
            ));
        }

        // Operations like CreateLogGroup reply with an empty body
        if response_body.trim().is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }

        Ok(serde_json::from_str(&response_body)?)
    }
}

/// Map a failed send to a connectivity error or a plain transport error
fn classify_send_error(endpoint: &str, error: reqwest::Error) -> CmdletError {
    if error.is_connect() {
        let cause = root_cause(&error);
        tracing::warn!("Cannot reach {}: {}", endpoint, cause);
        return CmdletError::Connectivity {
            endpoint: endpoint.to_string(),
            cause,
            source: error,
        };
    }
    CmdletError::Transport(error)
}

/// Innermost message in an error's source chain
fn root_cause(error: &(dyn std::error::Error + 'static)) -> String {
    let mut current = error;
    while let Some(next) = current.source() {
        current = next;
    }
    current.to_string()
}

/// Build a service error from an AWS JSON error reply
///
/// The code comes from `__type` (namespace stripped) or the
/// `x-amzn-ErrorType` header; the message from `message` or `Message`.
pub fn parse_service_error(status: u16, error_type_header: Option<&str>, body: &str) -> CmdletError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    let code = parsed
        .as_ref()
        .and_then(|v| v.get("__type").or_else(|| v.get("code")))
        .and_then(|v| v.as_str())
        .or(error_type_header)
        .map(short_error_code)
        .unwrap_or_else(|| format!("HTTP{}", status));

    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message").or_else(|| v.get("Message")))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_default();

    CmdletError::Service {
        status,
        code,
        message,
    }
}

/// "com.amazonaws.dynamodb.v20120810#ResourceNotFoundException" -> "ResourceNotFoundException"
/// "ThrottlingException:http://internal.amazon.com/" -> "ThrottlingException"
fn short_error_code(raw: &str) -> String {
    let after_hash = raw.rsplit('#').next().unwrap_or(raw);
    after_hash
        .split(':')
        .next()
        .unwrap_or(after_hash)
        .to_string()
}

/// Format a cmdlet error for display on one line
pub fn format_cmdlet_error(error: &CmdletError) -> String {
    match error {
        CmdletError::Connectivity { endpoint, cause, .. } => format!(
            "Unable to reach {}. Check the endpoint and your network connection ({}).",
            endpoint, cause
        ),
        CmdletError::Service { status, code, message } => {
            let hint = match *status {
                401 | 403 => " Check your credentials and permissions.",
                429 => " Rate limit exceeded. Please try again later.",
                500..=599 => " The service is temporarily unavailable.",
                _ => "",
            };
            if message.is_empty() {
                format!("{}.{}", code, hint)
            } else {
                format!("{}: {}.{}", code, message.trim_end_matches('.'), hint)
            }
        }
        CmdletError::Transport(e) if e.is_timeout() => {
            "Request timed out. Try again or raise it with `awscmd config --set-timeout <SECS>`.".to_string()
        }
        other => other.to_string(),
    }
}
