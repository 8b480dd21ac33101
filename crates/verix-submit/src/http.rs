//! # HTTP Transport
//!
//! [`Transport`] over `reqwest`. POSTs the opaque payload to the configured
//! endpoint with its content type and a bearer credential, then decodes a
//! 2xx body as a JSON [`RawResponse`].
//!
//! ## Error Mapping
//!
//! | Condition | `TransportError` |
//! |-----------|------------------|
//! | request timed out | `Timeout` |
//! | connect failure | `ConnectionError` |
//! | HTTP 5xx | `ServerError { status }` |
//! | HTTP 429, other non-2xx, undecodable body | `Other` |
//!
//! A numeric `Retry-After` header fills `server_wait_hint_seconds` when the
//! body does not carry its own hint. Retries are not built into this
//! adapter; the orchestrator owns retry policy.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use url::Url;

use crate::cancel::CancelSignal;
use crate::config::{ConfigError, SubmitConfig};
use crate::response::RawResponse;
use crate::transport::{Credential, SubmissionPayload, Transport, TransportError};

/// Longest response body excerpt kept in an error message.
const BODY_EXCERPT_LEN: usize = 256;

/// Real HTTP client for the authority's submission endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTransport {
    /// Build a transport from configuration.
    pub fn new(config: &SubmitConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn post(
        &self,
        payload: &SubmissionPayload,
        credential: &Credential,
    ) -> Result<RawResponse, TransportError> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, payload.content_type.as_str())
            .bearer_auth(credential.expose())
            .body(payload.body.clone())
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = resp.status();
        if status.is_server_error() {
            return Err(TransportError::ServerError {
                status: status.as_u16(),
            });
        }

        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Other(format!(
                "{} returned HTTP {status}: {}",
                self.endpoint,
                excerpt(&body)
            )));
        }

        let bytes = resp.bytes().await.map_err(classify_reqwest_error)?;
        let mut raw: RawResponse = serde_json::from_slice(&bytes).map_err(|e| {
            TransportError::Other(format!("undecodable response from {}: {e}", self.endpoint))
        })?;
        if raw.server_wait_hint_seconds.is_none() {
            raw.server_wait_hint_seconds = retry_after;
        }
        tracing::debug!(
            endpoint = %self.endpoint,
            status = status.as_u16(),
            lines = raw.lines.len(),
            "authority response decoded"
        );
        Ok(raw)
    }
}

impl Transport for HttpTransport {
    fn submit(
        &self,
        payload: &SubmissionPayload,
        credential: &Credential,
        _cancel: &CancelSignal,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send {
        self.post(payload, credential)
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::ConnectionError(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

fn excerpt(body: &str) -> &str {
    if body.len() <= BODY_EXCERPT_LEN {
        return body;
    }
    let mut end = BODY_EXCERPT_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_truncates_on_char_boundary() {
        assert_eq!(excerpt("short"), "short");
        let long = "é".repeat(200);
        let cut = excerpt(&long);
        assert!(cut.len() <= BODY_EXCERPT_LEN);
        assert!(long.starts_with(cut));
    }

    #[tokio::test]
    async fn closed_port_is_a_connection_error() {
        let mut cfg = SubmitConfig::local_mock(1).unwrap();
        cfg.timeout_secs = 2;
        let transport = HttpTransport::new(&cfg).unwrap();
        let err = transport
            .submit(
                &SubmissionPayload::json(b"{}".to_vec()),
                &Credential::bearer("t"),
                &CancelSignal::never(),
            )
            .await
            .unwrap_err();
        assert!(
            matches!(err, TransportError::ConnectionError(_) | TransportError::Timeout),
            "unexpected {err:?}"
        );
        assert!(err.is_retryable());
    }
}
