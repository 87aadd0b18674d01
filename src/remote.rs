/*!
 * The remote server that collects messages from the mesh.
 *
 * The store only talks to the server through the RemoteSource trait so it can be driven by
 * something other than HTTP (tests use an in-memory fake).
 */
use crate::{
    error::RemoteError,
    message::{decode_message_log, Message},
    SkaiNetResult,
};
use serde_json::Value;
use std::time::Duration;

/// Default base URL of the server API.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Anything that can serve, clear and acknowledge messages.
pub trait RemoteSource: Send + Sync {
    /// Get the full list of messages the server currently holds.
    fn fetch_messages(&self) -> Result<Vec<Message>, RemoteError>;

    /// Ask the server to forget all of its messages.
    fn clear_messages(&self) -> Result<(), RemoteError>;

    /// Tell the server the given record was handled.
    fn mark_rescued(&self, log_id: &str) -> Result<(), RemoteError>;
}

/** A RemoteSource backed by the server's JSON HTTP API. */
pub struct HttpSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpSource {
    /// Connect to the API rooted at `base_url`, e.g. "http://localhost:5000/api".
    pub fn new(base_url: &str) -> SkaiNetResult<Self> {
        Self::with_timeout(base_url, Duration::from_secs(10))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> SkaiNetResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(HttpSource {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Turn a non-2xx response into an error, preferring the server's own `error` field.
    fn check_status(
        resp: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, RemoteError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_owned))
            .unwrap_or_else(|| body.chars().take(200).collect());

        Err(RemoteError::Status {
            code: status.as_u16(),
            message,
        })
    }
}

impl RemoteSource for HttpSource {
    fn fetch_messages(&self) -> Result<Vec<Message>, RemoteError> {
        let resp = self
            .client
            .get(self.endpoint("messages"))
            .send()
            .map_err(connection_error)?;

        let resp = Self::check_status(resp)?;
        let bytes = resp.bytes().map_err(connection_error)?;

        decode_message_log(&bytes).map_err(|err| RemoteError::Protocol(err.to_string()))
    }

    fn clear_messages(&self) -> Result<(), RemoteError> {
        let resp = self
            .client
            .post(self.endpoint("clearMessages"))
            .send()
            .map_err(connection_error)?;

        Self::check_status(resp).map(|_| ())
    }

    fn mark_rescued(&self, log_id: &str) -> Result<(), RemoteError> {
        let body = serde_json::json!({ "log_id": log_id_value(log_id) });

        let resp = self
            .client
            .post(self.endpoint("markRescued"))
            .json(&body)
            .send()
            .map_err(connection_error)?;

        Self::check_status(resp).map(|_| ())
    }
}

fn connection_error(err: reqwest::Error) -> RemoteError {
    if err.is_decode() {
        RemoteError::Protocol(err.to_string())
    } else {
        RemoteError::Connection(err.to_string())
    }
}

/// Log ids go back to the server as numbers when they look like numbers.
fn log_id_value(log_id: &str) -> Value {
    match log_id.parse::<i64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::from(log_id),
    }
}
