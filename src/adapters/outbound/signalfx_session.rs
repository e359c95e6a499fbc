//! SignalFx Session
//!
//! Implements IngestClient on top of a single reqwest client. Handles the
//! auth header, JSON bodies, read-timeout retries and the API's error
//! envelope.

use crate::domain::ports::IngestClient;
use crate::error::UploadError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

/// Header carrying the access token on every call.
pub const TOKEN_HEADER: &str = "x-sf-token";

/// Connection settings for a SignalFx session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the REST API (used for the ping)
    pub address: String,
    /// Full URL of the datapoint ingest endpoint
    pub data_address: String,
    pub token: Option<String>,
    /// Budget for connecting, and again for the response
    pub timeout: Duration,
    /// Extra attempts after a read timeout
    pub retry_limit: u32,
    /// Max bytes of request/response bodies written to the debug log
    pub logger_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            address: crate::config::DEFAULT_ADDRESS.to_string(),
            data_address: crate::config::DEFAULT_DATA_ADDRESS.to_string(),
            token: None,
            timeout: Duration::from_secs(30),
            retry_limit: 5,
            logger_limit: 256,
        }
    }
}

/// Request body accepted by [`SignalfxSession::request`].
#[derive(Debug, Clone)]
pub enum Payload {
    /// Already encoded; sent as-is.
    Encoded(String),
    /// Encoded here, with a JSON content type.
    Json(Value),
}

/// HTTP session against the SignalFx API.
///
/// The underlying connection pool is shared by every call for the life of
/// the session.
pub struct SignalfxSession {
    config: SessionConfig,
    client: reqwest::Client,
}

impl SignalfxSession {
    pub fn new(config: SessionConfig) -> Result<Self, UploadError> {
        // Connect timeouts must surface as connect errors, so the overall
        // deadline leaves room for both phases.
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout.saturating_mul(2))
            .build()
            .map_err(|e| UploadError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Perform one API call and decode its JSON result.
    ///
    /// The method defaults to GET without a body and POST with one. Read
    /// timeouts are retried up to `retry_limit` times with the identical
    /// request. An empty body decodes to an empty object.
    pub async fn request(
        &self,
        url: &str,
        data: Option<Payload>,
        mut headers: HeaderMap,
        method: Option<Method>,
    ) -> Result<Value, UploadError> {
        if !headers.contains_key(TOKEN_HEADER) {
            if let Some(token) = &self.config.token {
                let value = HeaderValue::from_str(token)
                    .map_err(|_| UploadError::Config("token is not a valid header value".to_string()))?;
                headers.insert(TOKEN_HEADER, value);
            }
        }

        let method = method.unwrap_or(if data.is_none() { Method::GET } else { Method::POST });

        let body = match data {
            None => None,
            Some(Payload::Encoded(s)) => Some(s),
            Some(Payload::Json(v)) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                Some(serde_json::to_string(&v)?)
            }
        };

        tracing::debug!(
            "request: {} {} {}",
            method,
            url,
            body.as_deref().map(|b| truncate(b, self.config.logger_limit)).unwrap_or("None")
        );

        let mut retries_left = self.config.retry_limit;
        let response = loop {
            let mut builder = self.client.request(method.clone(), url).headers(headers.clone());
            if let Some(body) = &body {
                builder = builder.body(body.clone());
            }

            match builder.send().await {
                Ok(response) => break response,
                Err(e) if e.is_timeout() && !e.is_connect() && retries_left > 0 => {
                    retries_left -= 1;
                    tracing::warn!("read timeout: {}. retry...", url);
                }
                Err(e) => return Err(e.into()),
            }
        };

        let status = response.status();
        let text = response.text().await?;

        tracing::debug!(
            "response [{}]: {}",
            status.as_u16(),
            truncate(&text, self.config.logger_limit)
        );

        if status.as_u16() >= 400 {
            return Err(match decode(&text) {
                Ok(result) => match error_field(&result) {
                    Some(err) => UploadError::Network(format!("API call error {}: {}", url, err)),
                    None => UploadError::Network(format!(
                        "API call error {} on {}: {}",
                        status.as_u16(),
                        url,
                        result
                    )),
                },
                Err(_) => UploadError::Network(format!(
                    "API call error {}: {} {}",
                    url,
                    status.as_u16(),
                    status.canonical_reason().unwrap_or_default()
                )),
            });
        }

        let result = decode(&text).map_err(|e| {
            tracing::debug!("response: {}", text);
            UploadError::Network(format!("non-JSON response from API: {}", e))
        })?;

        if let Some(err) = error_field(&result) {
            return Err(UploadError::Network(format!("API call error {}: {}", url, err)));
        }

        Ok(result)
    }
}

#[async_trait]
impl IngestClient for SignalfxSession {
    async fn ping(&self) -> Result<(), UploadError> {
        let url = format!("{}/v2/organization", self.config.address);
        self.request(&url, None, HeaderMap::new(), None).await?;
        Ok(())
    }

    async fn send_kpi_data(&self, body: String) -> Result<(), UploadError> {
        let url = &self.config.data_address;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = self
            .request(url, Some(Payload::Encoded(body)), headers, None)
            .await?;

        if let Some(code) = response.get("response_code") {
            if code.as_f64() != Some(200.0) {
                return Err(UploadError::Network(format!(
                    "failed to feed data to {}, response code {}",
                    url, code
                )));
            }
        }

        Ok(())
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }
}

fn decode(text: &str) -> Result<Value, serde_json::Error> {
    if text.is_empty() {
        Ok(Value::Object(Default::default()))
    } else {
        serde_json::from_str(text)
    }
}

/// A non-empty `error` member of the response envelope, if any.
fn error_field(result: &Value) -> Option<String> {
    let err = result.get("error")?;
    let present = match err {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    };
    present.then(|| match err {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

fn truncate(s: &str, limit: usize) -> &str {
    if s.len() <= limit {
        return s;
    }
    let mut end = limit;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
