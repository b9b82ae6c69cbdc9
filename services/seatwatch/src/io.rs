//! HTTP client abstraction for testability

use std::time::Duration;

use async_trait::async_trait;

use crate::SeatWatchError;

/// HTTP response from a request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Abstraction over HTTP client for dependency injection
///
/// `authorization` is the full `Authorization` header value, e.g. `Bearer abc`;
/// an empty string sends no header.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait HttpClient: Send + Sync {
    /// Send an authorized GET request to the given URL
    async fn get(&self, url: &str, authorization: &str) -> crate::Result<HttpResponse>;

    /// Send an authorized POST request with a form-encoded body
    async fn post_form(
        &self,
        url: &str,
        authorization: &str,
        params: &[(&str, &str)],
    ) -> crate::Result<HttpResponse>;
}

/// Production HTTP client using reqwest
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Build a client whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SeatWatchError::Http(format!("Building HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn read(
        url: &str,
        method: &str,
        response: reqwest::Response,
    ) -> crate::Result<HttpResponse> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| SeatWatchError::Http(format!("Reading response body: {}", e)))?;

        tracing::debug!("{} {} -> {} ({} bytes)", method, url, status, body.len());
        Ok(HttpResponse { status, body })
    }
}

fn with_authorization(
    request: reqwest::RequestBuilder,
    authorization: &str,
) -> reqwest::RequestBuilder {
    if authorization.is_empty() {
        request
    } else {
        request.header(reqwest::header::AUTHORIZATION, authorization)
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, authorization: &str) -> crate::Result<HttpResponse> {
        tracing::debug!("GET {}", url);
        let response = with_authorization(self.client.get(url), authorization)
            .send()
            .await
            .map_err(|e| SeatWatchError::Http(format!("GET {} failed: {}", url, e)))?;

        Self::read(url, "GET", response).await
    }

    async fn post_form(
        &self,
        url: &str,
        authorization: &str,
        params: &[(&str, &str)],
    ) -> crate::Result<HttpResponse> {
        tracing::debug!("POST {}", url);
        let response = with_authorization(self.client.post(url), authorization)
            .form(params)
            .send()
            .await
            .map_err(|e| SeatWatchError::Http(format!("POST {} failed: {}", url, e)))?;

        Self::read(url, "POST", response).await
    }
}
