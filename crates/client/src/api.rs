//! Thin reqwest wrapper for the hrdesk REST API.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use hrdesk_core::error::CoreError;

/// Errors from the REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code.
    #[error("API error ({status}): {body}")]
    Status {
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A 2xx body did not have the expected shape.
    #[error("Unexpected response shape: {0}")]
    Shape(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            Self::Shape(_) => None,
        }
    }
}

impl From<ApiError> for CoreError {
    fn from(err: ApiError) -> Self {
        match &err {
            ApiError::Status { status: 409, body } => CoreError::Conflict(body.clone()),
            ApiError::Status {
                status: 400 | 422,
                body,
            } => CoreError::Validation(body.clone()),
            _ => CoreError::Remote(err.to_string()),
        }
    }
}

/// HTTP client bound to one API base URL.
#[derive(Debug, Clone)]
pub struct HrApi {
    client: reqwest::Client,
    api_url: String,
}

impl HrApi {
    /// Build a client with a per-request timeout.
    ///
    /// * `api_url` - Base URL, e.g. `http://localhost:8080/api/v1`.
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_url))
    }

    /// Reuse an existing [`reqwest::Client`] for connection pooling.
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        tracing::debug!(%url, "GET");
        let response = self.client.get(url).send().await?;
        Self::parse_response(response).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        tracing::debug!(%url, "POST");
        let response = self.client.post(url).json(body).send().await?;
        Self::parse_response(response).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        tracing::debug!(%url, "PUT");
        let response = self.client.put(url).json(body).send().await?;
        Self::parse_response(response).await
    }

    /// `POST` with no body, discarding the response body.
    pub async fn post_empty(&self, url: &str) -> Result<(), ApiError> {
        tracing::debug!(%url, "POST");
        let response = self.client.post(url).send().await?;
        Self::check_status(response).await
    }

    pub async fn delete(&self, url: &str) -> Result<(), ApiError> {
        tracing::debug!(%url, "DELETE");
        let response = self.client.delete(url).send().await?;
        Self::check_status(response).await
    }

    // ---- private helpers ----

    /// Return the response unchanged on a success status, or an
    /// [`ApiError::Status`] with the body text otherwise.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn check_status(response: reqwest::Response) -> Result<(), ApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_map_to_core_errors() {
        let conflict = ApiError::Status {
            status: 409,
            body: "name taken".into(),
        };
        assert_eq!(
            CoreError::from(conflict),
            CoreError::Conflict("name taken".into())
        );

        let invalid = ApiError::Status {
            status: 422,
            body: "title too long".into(),
        };
        assert_eq!(
            CoreError::from(invalid),
            CoreError::Validation("title too long".into())
        );

        let server = ApiError::Status {
            status: 500,
            body: "boom".into(),
        };
        assert!(matches!(CoreError::from(server), CoreError::Remote(_)));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let api = HrApi::with_client(reqwest::Client::new(), "http://host/api/v1/");
        assert_eq!(api.api_url(), "http://host/api/v1");
    }
}
