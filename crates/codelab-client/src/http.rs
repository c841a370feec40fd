use std::time::Duration;

use codelab_api_types::ApiResponse;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Base-URL'd HTTP wrapper around a shared `reqwest::Client`.
///
/// The underlying client keeps a cookie store so the refresh-token cookie the
/// service sets at login travels with every later call. Request construction
/// is exposed as plain builders; the authenticated layer decorates them.
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(base_url: &str) -> Result<HttpClient, ApiError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(ApiError::from)?;

        Ok(HttpClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout: Duration::from_secs(30),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> HttpClient {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.get(self.url(path)).timeout(self.timeout)
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(self.url(path)).timeout(self.timeout)
    }

    /// Send a request and unwrap the service's body envelope.
    ///
    /// Errors prefer the machine-readable `statusCode` from the body; when the
    /// body isn't an envelope the HTTP status stands in, and a missing status
    /// classifies as the generic failure.
    pub async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await.map_err(ApiError::from)?;
        let http_status = response.status();
        let bytes = response.bytes().await.map_err(ApiError::from)?;

        if !http_status.is_success() {
            return Err(decode_error_body(&bytes, http_status.as_u16()));
        }

        let envelope: ApiResponse<T> =
            serde_json::from_slice(&bytes).map_err(|err| ApiError::Decode(err.to_string()))?;

        if !envelope.success {
            return Err(ApiError::Status {
                status: Some(envelope.status_code),
                message: envelope.message,
            });
        }

        envelope
            .into_data()
            .map_err(|err| ApiError::Decode(err.to_string()))
    }

    /// Like [`HttpClient::send`] for endpoints whose envelope carries no data.
    pub async fn send_empty(&self, request: reqwest::RequestBuilder) -> Result<(), ApiError> {
        let response = request.send().await.map_err(ApiError::from)?;
        let http_status = response.status();
        let bytes = response.bytes().await.map_err(ApiError::from)?;

        if !http_status.is_success() {
            return Err(decode_error_body(&bytes, http_status.as_u16()));
        }

        Ok(())
    }
}

fn decode_error_body(bytes: &[u8], http_status: u16) -> ApiError {
    match serde_json::from_slice::<ApiResponse<serde_json::Value>>(bytes) {
        Ok(envelope) => ApiError::Status {
            status: Some(envelope.status_code),
            message: envelope.message,
        },
        Err(_) => ApiError::Status {
            status: Some(http_status),
            message: String::new(),
        },
    }
}
