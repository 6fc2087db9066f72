//! Long-running operation helpers shared by the cognitive service clients.
//!
//! Both document analysis and abstractive summarization follow the same protocol: a submit
//! request answers `202 Accepted` with an `Operation-Location` header, and the caller polls that
//! URL until the `status` field reaches a terminal state.

use reqwest::{RequestBuilder, Response, StatusCode, header::RETRY_AFTER};
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Header carrying the subscription key for cognitive service resources.
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

const OPERATION_LOCATION: &str = "operation-location";

/// Errors raised while submitting or polling a long-running operation.
#[derive(Debug, Error)]
pub enum OperationError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The service responded with an unexpected status code.
    #[error("Unexpected service response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Submission was accepted but no operation URL was returned.
    #[error("Service accepted the job without an Operation-Location header")]
    MissingOperationLocation,
    /// The operation did not reach a terminal state in time.
    #[error("Operation did not complete within {0:?}")]
    TimedOut(Duration),
}

/// `{code, message}` error object embedded in service responses.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ServiceErrorDetail {
    /// Service-defined error code.
    #[serde(default)]
    pub code: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

/// Timing knobs for polling a long-running operation.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    /// Delay between polls when the service does not send `Retry-After`.
    pub interval: Duration,
    /// Give up once this much time has elapsed since the first poll.
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Send a submit request and return the operation URL to poll.
pub(crate) async fn start_operation(request: RequestBuilder) -> Result<String, OperationError> {
    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(unexpected_status(response).await);
    }

    response
        .headers()
        .get(OPERATION_LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .ok_or(OperationError::MissingOperationLocation)
}

/// Poll an operation URL until its `status` is terminal and return the final body.
///
/// `build_request` is invoked once per poll so callers can attach their own auth headers.
pub(crate) async fn poll_operation<F>(
    operation_url: &str,
    settings: PollSettings,
    build_request: F,
) -> Result<Value, OperationError>
where
    F: Fn(&str) -> RequestBuilder,
{
    let started = Instant::now();
    loop {
        let response = build_request(operation_url).send().await?;
        if !response.status().is_success() {
            return Err(unexpected_status(response).await);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body: Value = response.json().await?;
        let status = body
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or_default();

        if is_terminal(status) {
            tracing::debug!(operation = operation_url, status, "Operation finished");
            return Ok(body);
        }

        let delay = retry_after.unwrap_or(settings.interval);
        if started.elapsed() + delay > settings.timeout {
            tracing::warn!(
                operation = operation_url,
                status,
                timeout = ?settings.timeout,
                "Operation polling timed out"
            );
            return Err(OperationError::TimedOut(settings.timeout));
        }
        tracing::debug!(operation = operation_url, status, ?delay, "Operation still running");
        tokio::time::sleep(delay).await;
    }
}

fn is_terminal(status: &str) -> bool {
    matches!(
        status.to_ascii_lowercase().as_str(),
        "succeeded" | "failed" | "canceled" | "cancelled" | "partiallycompleted"
    )
}

pub(crate) async fn unexpected_status(response: Response) -> OperationError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    OperationError::UnexpectedStatus { status, body }
}

pub(crate) fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, Method::POST, MockServer};
    use reqwest::Client;
    use serde_json::json;

    fn fast_settings() -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(10),
            timeout: Duration::from_millis(60),
        }
    }

    #[tokio::test]
    async fn start_operation_reads_operation_location() {
        let server = MockServer::start_async().await;
        let location = format!("{}/operations/42", server.base_url());
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/submit");
                then.status(202).header("Operation-Location", location.as_str());
            })
            .await;

        let url = start_operation(Client::new().post(server.url("/submit")))
            .await
            .expect("operation url");

        mock.assert();
        assert_eq!(url, location);
    }

    #[tokio::test]
    async fn start_operation_requires_header() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/submit");
                then.status(202);
            })
            .await;

        let error = start_operation(Client::new().post(server.url("/submit")))
            .await
            .expect_err("missing header");

        assert!(matches!(error, OperationError::MissingOperationLocation));
    }

    #[tokio::test]
    async fn poll_returns_terminal_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/operations/1");
                then.status(200)
                    .json_body(json!({ "status": "succeeded", "value": 7 }));
            })
            .await;

        let client = Client::new();
        let body = poll_operation(&server.url("/operations/1"), fast_settings(), |url| {
            client.get(url)
        })
        .await
        .expect("terminal body");

        assert_eq!(body["value"], 7);
    }

    #[tokio::test]
    async fn poll_gives_up_after_timeout() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/operations/2");
                then.status(200).json_body(json!({ "status": "running" }));
            })
            .await;

        let client = Client::new();
        let error = poll_operation(&server.url("/operations/2"), fast_settings(), |url| {
            client.get(url)
        })
        .await
        .expect_err("timeout");

        assert!(matches!(error, OperationError::TimedOut(_)));
    }

    #[test]
    fn terminal_states_are_case_insensitive() {
        assert!(is_terminal("Succeeded"));
        assert!(is_terminal("partiallyCompleted"));
        assert!(!is_terminal("running"));
        assert!(!is_terminal("notStarted"));
    }
}
