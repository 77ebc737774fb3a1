//! IBM Cloud IAM
//!
//! Exchanges a long-lived API key for a short-lived bearer token.

use std::time::Duration;

use autosphere_core::{AgentError, Result};
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::http::{build_client, ensure_success, transport_error};

/// Fixed token-issuance endpoint
pub const IAM_TOKEN_URL: &str = "https://iam.cloud.ibm.com/identity/token";

const GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Tokens are refreshed this long before they expire
const REFRESH_MARGIN_SECS: i64 = 60;

/// Outcome of checking an API key
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyStatus {
    /// Key accepted; carries the issued bearer token
    Valid(String),
    /// Key rejected, or no usable token in the answer
    Invalid,
}

impl KeyStatus {
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Valid(token) => Some(token),
            Self::Invalid => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,

    /// Unix seconds
    #[serde(default)]
    expiration: Option<i64>,
}

/// A bearer token and when it stops working
#[derive(Clone, Debug)]
pub struct BearerToken {
    pub access_token: String,
    pub expiration: Option<DateTime<Utc>>,
}

impl BearerToken {
    /// Still usable at `now`, keeping a refresh margin
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expiration
            .is_none_or(|exp| now + chrono::Duration::seconds(REFRESH_MARGIN_SECS) < exp)
    }
}

/// Client for the IAM token endpoint
#[derive(Clone, Debug)]
pub struct IamClient {
    http: Client,
    token_url: String,
}

impl IamClient {
    pub fn new(token_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: build_client(timeout)?,
            token_url: token_url.into(),
        })
    }

    async fn post_api_key(&self, api_key: &str) -> Result<reqwest::Response> {
        self.http
            .post(&self.token_url)
            .header(header::ACCEPT, "application/json")
            .form(&[("grant_type", GRANT_TYPE), ("apikey", api_key)])
            .send()
            .await
            .map_err(|e| transport_error(&e))
    }

    /// Check whether `api_key` can obtain a token.
    ///
    /// Any non-200 answer, or a 200 without a non-empty `access_token`, is
    /// `Invalid`. Failing to reach the endpoint is an error, not `Invalid`.
    pub async fn validate(&self, api_key: &str) -> Result<KeyStatus> {
        let response = self.post_api_key(api_key).await?;

        if response.status() != StatusCode::OK {
            tracing::debug!(status = %response.status(), "IAM rejected API key");
            return Ok(KeyStatus::Invalid);
        }

        let body: TokenResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(error = %e, "IAM answered 200 without a token body");
                return Ok(KeyStatus::Invalid);
            }
        };

        Ok(match body.access_token {
            Some(token) if !token.is_empty() => KeyStatus::Valid(token),
            _ => KeyStatus::Invalid,
        })
    }

    /// Fetch a token for authenticating provider calls
    pub async fn request_token(&self, api_key: &str) -> Result<BearerToken> {
        let response = ensure_success(self.post_api_key(api_key).await?).await?;

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AgentError::MalformedResponse(format!("IAM token response: {e}")))?;

        let access_token = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AgentError::Auth("IAM returned no access token".into()))?;

        Ok(BearerToken {
            access_token,
            expiration: body
                .expiration
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        })
    }
}

/// Caches a bearer token and refreshes it shortly before expiry
pub struct TokenSource {
    iam: IamClient,
    api_key: String,
    cached: Mutex<Option<BearerToken>>,
}

impl TokenSource {
    pub fn new(iam: IamClient, api_key: impl Into<String>) -> Self {
        Self {
            iam,
            api_key: api_key.into(),
            cached: Mutex::new(None),
        }
    }

    /// Current bearer token, fetching a new one when needed
    pub async fn bearer(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.access_token.clone());
        }

        tracing::debug!("Refreshing IAM bearer token");
        let token = self.iam.request_token(&self.api_key).await?;
        let access = token.access_token.clone();
        *cached = Some(token);
        Ok(access)
    }
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSource")
            .field("iam", &self.iam)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn iam_for(server: &MockServer) -> IamClient {
        IamClient::new(format!("{}/identity/token", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_valid_key_returns_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/identity/token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("apikey=good-key"))
            .and(body_string_contains("grant_type=urn%3Aibm%3Aparams%3Aoauth%3Agrant-type%3Aapikey"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "eyJ.token",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;

        let status = iam_for(&server).await.validate("good-key").await.unwrap();
        assert!(status.is_valid());
        assert_eq!(status.token(), Some("eyJ.token"));
    }

    #[tokio::test]
    async fn test_rejected_key_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/identity/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "errorCode": "BXNIM0415E",
                "errorMessage": "Provided API key could not be found."
            })))
            .mount(&server)
            .await;

        let status = iam_for(&server).await.validate("bad-key").await.unwrap();
        assert_eq!(status, KeyStatus::Invalid);
        assert!(status.token().is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let status = iam_for(&server).await.validate("any").await.unwrap();
        assert_eq!(status, KeyStatus::Invalid);
    }

    #[tokio::test]
    async fn test_empty_or_missing_token_is_invalid() {
        for body in [json!({"access_token": ""}), json!({"token_type": "Bearer"})] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_json(body))
                .mount(&server)
                .await;

            let status = iam_for(&server).await.validate("key").await.unwrap();
            assert_eq!(status, KeyStatus::Invalid);
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let iam = IamClient::new("http://127.0.0.1:9/identity/token", Duration::from_secs(2)).unwrap();
        let err = iam.validate("key").await.unwrap_err();
        assert!(matches!(err, AgentError::Network(_)));
    }

    #[tokio::test]
    async fn test_token_source_caches_fresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/identity/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "cached-token",
                "expiration": Utc::now().timestamp() + 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source = TokenSource::new(iam_for(&server).await, "key");
        assert_eq!(source.bearer().await.unwrap(), "cached-token");
        assert_eq!(source.bearer().await.unwrap(), "cached-token");
    }

    #[tokio::test]
    async fn test_token_source_surfaces_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let source = TokenSource::new(iam_for(&server).await, "revoked");
        assert!(matches!(source.bearer().await, Err(AgentError::Auth(_))));
    }

    #[test]
    fn test_token_freshness() {
        let now = Utc::now();
        let stale = BearerToken {
            access_token: "t".into(),
            expiration: Some(now + chrono::Duration::seconds(30)),
        };
        let fresh = BearerToken {
            access_token: "t".into(),
            expiration: Some(now + chrono::Duration::seconds(600)),
        };
        assert!(!stale.is_fresh(now));
        assert!(fresh.is_fresh(now));
    }
}
