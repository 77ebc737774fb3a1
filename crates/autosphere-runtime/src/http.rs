//! Shared HTTP plumbing for the IBM Cloud clients

use std::time::Duration;

use autosphere_core::{AgentError, Result};
use reqwest::{Client, StatusCode};

/// Build a client with the configured request timeout
pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AgentError::Config(format!("HTTP client: {e}")))
}

/// Classify a transport-level failure
pub(crate) fn transport_error(err: &reqwest::Error) -> AgentError {
    if err.is_decode() {
        AgentError::MalformedResponse(err.to_string())
    } else {
        AgentError::Network(err.to_string())
    }
}

/// Map a non-success status to the matching error variant
pub(crate) fn status_error(status: StatusCode, body: &str) -> AgentError {
    let detail = format!("{status}: {}", body.chars().take(300).collect::<String>());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(detail),
        StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(detail),
        s if s.is_server_error() => AgentError::ProviderUnavailable(detail),
        _ => AgentError::Provider(detail),
    }
}

/// Fail with a classified error unless the response succeeded
pub(crate) async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(status_error(StatusCode::UNAUTHORIZED, ""), AgentError::Auth(_)));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, ""),
            AgentError::RateLimited(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, ""),
            AgentError::ProviderUnavailable(_)
        ));
        assert!(matches!(status_error(StatusCode::BAD_REQUEST, "bad"), AgentError::Provider(_)));
    }
}
