//! CRaaS v2 token API client.
//!
//! Thin JSON-over-HTTP client for the registry token endpoints:
//! - `POST   /tokens`       create (the only call that returns the secret)
//! - `GET    /tokens`       list
//! - `GET    /tokens/{id}`  read
//! - `PATCH  /tokens/{id}`  update name, scope or expiration
//! - `DELETE /tokens/{id}`  delete
//!
//! Every call is a single attempt; callers decide what a failure means.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::delete_guard;
use crate::models::token::{Expiration, Token, TokenScope};

const AUTH_HEADER: &str = "X-Auth-Token";

/// HTTP-level result of a call that produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseResult {
    pub status: StatusCode,
}

impl fmt::Display for ResponseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("request to CRaaS API failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("CRaaS API returned {response}: {body}")]
    Status { response: ResponseResult, body: String },

    #[error("failed to decode CRaaS API response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("endpoint cannot carry a path: {0}")]
    InvalidEndpoint(String),
}

impl ApiError {
    /// The HTTP response behind this error, if the server answered at all.
    pub fn response(&self) -> Option<&ResponseResult> {
        match self {
            ApiError::Status { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        delete_guard::is_not_found(self.response())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTokenRequest {
    pub name: String,
    pub expiration: Expiration,
    pub scope: TokenScope,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateTokenRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<Expiration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<TokenScope>,
}

impl UpdateTokenRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.expiration.is_none() && self.scope.is_none()
    }
}

/// Creation response: the token plus its secret value.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedToken {
    #[serde(flatten)]
    pub token: Token,
    #[serde(rename = "token")]
    pub secret: String,
}

/// Operations the resource handlers need from the remote API.
#[async_trait]
pub trait TokenApi: Send + Sync {
    async fn create_token(&self, req: &CreateTokenRequest) -> Result<CreatedToken, ApiError>;

    async fn list_tokens(&self) -> Result<Vec<Token>, ApiError>;

    async fn get_token(&self, id: &str) -> Result<Token, ApiError>;

    async fn update_token(&self, id: &str, req: &UpdateTokenRequest) -> Result<Token, ApiError>;

    /// Returns the response on 2xx; any other status is an `ApiError::Status`.
    async fn delete_token(&self, id: &str) -> Result<ResponseResult, ApiError>;
}

pub struct CraasClient {
    endpoint: Url,
    auth_token: String,
    http: Client,
}

impl CraasClient {
    pub fn new(endpoint: Url, auth_token: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        if endpoint.cannot_be_a_base() {
            return Err(ApiError::InvalidEndpoint(endpoint.to_string()));
        }

        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("craas-token/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Transport)?;

        Ok(Self {
            endpoint,
            auth_token: auth_token.into(),
            http,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.endpoint.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidEndpoint(self.endpoint.to_string()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        Ok(self
            .http
            .request(method, self.url(segments)?)
            .header(AUTH_HEADER, &self.auth_token)
            .header("Accept", "application/json"))
    }

    /// Send and return the body of a 2xx response.
    async fn send(&self, builder: RequestBuilder) -> Result<(ResponseResult, String), ApiError> {
        let resp = builder.send().await.map_err(ApiError::Transport)?;
        let result = ResponseResult {
            status: resp.status(),
        };
        let body = resp.text().await.map_err(ApiError::Transport)?;

        if !result.status.is_success() {
            tracing::debug!(status = %result.status, "CRaaS API call failed");
            return Err(ApiError::Status {
                response: result,
                body,
            });
        }

        Ok((result, body))
    }
}

#[async_trait]
impl TokenApi for CraasClient {
    async fn create_token(&self, req: &CreateTokenRequest) -> Result<CreatedToken, ApiError> {
        let (_, body) = self.send(self.request(Method::POST, &["tokens"])?.json(req)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn list_tokens(&self) -> Result<Vec<Token>, ApiError> {
        let (_, body) = self.send(self.request(Method::GET, &["tokens"])?).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_token(&self, id: &str) -> Result<Token, ApiError> {
        let (_, body) = self.send(self.request(Method::GET, &["tokens", id])?).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn update_token(&self, id: &str, req: &UpdateTokenRequest) -> Result<Token, ApiError> {
        let (_, body) = self
            .send(self.request(Method::PATCH, &["tokens", id])?.json(req))
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn delete_token(&self, id: &str) -> Result<ResponseResult, ApiError> {
        let (result, _) = self.send(self.request(Method::DELETE, &["tokens", id])?).await?;
        Ok(result)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> CraasClient {
        CraasClient::new(endpoint.parse().unwrap(), "secret", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_url_appends_segments() {
        let c = client("https://cr.example.com/api/v2");
        assert_eq!(
            c.url(&["tokens", "abc"]).unwrap().as_str(),
            "https://cr.example.com/api/v2/tokens/abc"
        );
    }

    #[test]
    fn test_url_tolerates_trailing_slash() {
        let c = client("https://cr.example.com/api/v2/");
        assert_eq!(
            c.url(&["tokens"]).unwrap().as_str(),
            "https://cr.example.com/api/v2/tokens"
        );
    }

    #[test]
    fn test_url_escapes_id() {
        let c = client("https://cr.example.com/api/v2");
        let url = c.url(&["tokens", "a/b"]).unwrap();
        assert_eq!(url.path(), "/api/v2/tokens/a%2Fb");
    }

    #[test]
    fn test_non_base_endpoint_rejected() {
        let err = CraasClient::new("mailto:ops@example.com".parse().unwrap(), "s", Duration::from_secs(1));
        assert!(matches!(err, Err(ApiError::InvalidEndpoint(_))));
    }

    #[test]
    fn test_status_error_exposes_response() {
        let err = ApiError::Status {
            response: ResponseResult {
                status: StatusCode::NOT_FOUND,
            },
            body: "{}".into(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.response().map(|r| r.status), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_decode_error_has_no_response() {
        let err = ApiError::from(serde_json::from_str::<Token>("nope").unwrap_err());
        assert!(err.response().is_none());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_empty_update_serializes_to_empty_object() {
        let req = UpdateTokenRequest::default();
        assert!(req.is_empty());
        assert_eq!(serde_json::to_value(&req).unwrap(), serde_json::json!({}));
    }
}
