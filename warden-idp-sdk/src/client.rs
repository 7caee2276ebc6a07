//! Identity platform API client

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

use crate::directory::Directory;
use crate::error::{IdpError, RetryConfig};
use crate::relationships::Relationships;
use crate::stepup::StepUp;
use crate::tokens::{TokenCache, TokenResponse};

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the identity platform's management, relationship-store, and
/// step-up APIs.
///
/// All three surfaces authenticate with a machine-to-machine token obtained
/// via the client-credentials grant and cached with an expiry buffer (see
/// [`TokenCache`]).
pub struct IdpClient {
    pub(crate) client: reqwest::Client,
    pub(crate) api_base: String,
    pub(crate) store_base: String,
    client_id: String,
    client_secret: String,
    retry_config: RetryConfig,
    tokens: TokenCache,
}

impl std::fmt::Debug for IdpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdpClient")
            .field("api_base", &self.api_base)
            .field("store_base", &self.store_base)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("retry_config", &self.retry_config)
            .finish()
    }
}

impl IdpClient {
    /// Create a builder for client configuration
    pub fn builder() -> IdpClientBuilder {
        IdpClientBuilder::new()
    }

    /// Handle to the relationship store API
    pub fn relationships(&self) -> Relationships<'_> {
        Relationships { client: self }
    }

    /// Handle to the directory/management API
    pub fn directory(&self) -> Directory<'_> {
        Directory { client: self }
    }

    /// Handle to the step-up approval API
    pub fn step_up(&self) -> StepUp<'_> {
        StepUp { client: self }
    }

    /// The bearer token for API calls, refreshed lazily on expiry.
    pub(crate) async fn bearer(&self) -> Result<String, IdpError> {
        if let Some(token) = self.tokens.get(Utc::now()) {
            return Ok(token);
        }

        let url = format!("{}/oauth/token", self.api_base);
        let body = json!({
            "grant_type": "client_credentials",
            "client_id": self.client_id,
            "client_secret": self.client_secret,
        });

        let response: TokenResponse = self
            .execute_with_retry(&url, Some(&body), reqwest::Method::POST, None)
            .await?;
        self.tokens
            .store(response.access_token.clone(), response.expires_in, Utc::now());
        Ok(response.access_token)
    }

    /// Execute a request expecting a JSON body, with automatic retry.
    pub(crate) async fn execute_with_retry<T, B>(
        &self,
        url: &str,
        body: Option<&B>,
        method: reqwest::Method,
        bearer: Option<&str>,
    ) -> Result<T, IdpError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let response = self.request_with_retry(url, body, method, bearer).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| IdpError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    /// Execute a request whose success response has no body.
    pub(crate) async fn execute_no_content<B>(
        &self,
        url: &str,
        body: Option<&B>,
        method: reqwest::Method,
        bearer: Option<&str>,
    ) -> Result<(), IdpError>
    where
        B: Serialize,
    {
        self.request_with_retry(url, body, method, bearer).await?;
        Ok(())
    }

    /// Shared retry loop: exponential backoff with jitter, `Retry-After`
    /// honored, retryable-status detection (408/409/429/5xx).
    async fn request_with_retry<B>(
        &self,
        url: &str,
        body: Option<&B>,
        method: reqwest::Method,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response, IdpError>
    where
        B: Serialize,
    {
        let headers = build_headers(bearer)?;
        let mut last_error: Option<IdpError> = None;

        for attempt in 0..=self.retry_config.max_retries {
            let mut request = self
                .client
                .request(method.clone(), url)
                .headers(headers.clone());
            if let Some(b) = body {
                request = request.json(b);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let status_code = status.as_u16();
                    let retry_after = RetryConfig::parse_retry_after(response.headers());
                    let error_body = response.text().await.unwrap_or_default();
                    let error = IdpError::from_response(&error_body, status_code);

                    if attempt < self.retry_config.max_retries
                        && IdpError::is_retryable_status(status_code)
                    {
                        let delay = retry_after
                            .unwrap_or_else(|| self.retry_config.delay_for_attempt(attempt));
                        tokio::time::sleep(delay).await;
                        last_error = Some(error);
                        continue;
                    }

                    return Err(error);
                }
                Err(e) => {
                    let error = IdpError::from_reqwest_error(e);
                    if attempt < self.retry_config.max_retries && error.is_retryable() {
                        let delay = self.retry_config.delay_for_attempt(attempt);
                        tokio::time::sleep(delay).await;
                        last_error = Some(error);
                        continue;
                    }
                    return Err(error);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| IdpError::Network("Max retries exceeded".to_string())))
    }
}

/// Builder for [`IdpClient`] configuration
pub struct IdpClientBuilder {
    api_base: Option<String>,
    store_base: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    timeout: Option<Duration>,
    retry_config: Option<RetryConfig>,
}

impl IdpClientBuilder {
    fn new() -> Self {
        Self {
            api_base: None,
            store_base: None,
            client_id: None,
            client_secret: None,
            timeout: None,
            retry_config: None,
        }
    }

    /// Set the tenant base URL (management + step-up + token endpoint)
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    /// Set the relationship store base URL (defaults to the tenant base)
    pub fn store_base(mut self, store_base: impl Into<String>) -> Self {
        self.store_base = Some(store_base.into());
        self
    }

    /// Set the machine-to-machine client id
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set the machine-to-machine client secret
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the maximum number of retries (default: 2)
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        let mut config = self.retry_config.take().unwrap_or_default();
        config.max_retries = max_retries;
        self.retry_config = Some(config);
        self
    }

    /// Set custom retry configuration
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = Some(config);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<IdpClient, IdpError> {
        let api_base = self
            .api_base
            .ok_or_else(|| IdpError::Configuration("api_base is required".to_string()))?;
        let client_id = self
            .client_id
            .ok_or_else(|| IdpError::Configuration("client_id is required".to_string()))?;
        let client_secret = self
            .client_secret
            .ok_or_else(|| IdpError::Configuration("client_secret is required".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(|e| {
                IdpError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(IdpClient {
            client,
            store_base: self.store_base.unwrap_or_else(|| api_base.clone()),
            api_base,
            client_id,
            client_secret,
            retry_config: self.retry_config.unwrap_or_default(),
            tokens: TokenCache::new(),
        })
    }
}

fn build_headers(bearer: Option<&str>) -> Result<HeaderMap, IdpError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(token) = bearer {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| IdpError::Configuration(format!("Invalid bearer token: {}", e)))?,
        );
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base: &str) -> IdpClient {
        IdpClient::builder()
            .api_base(base)
            .client_id("m2m-client")
            .client_secret("m2m-secret")
            .max_retries(0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_api_base() {
        let result = IdpClient::builder()
            .client_id("id")
            .client_secret("secret")
            .build();
        assert!(matches!(result, Err(IdpError::Configuration(_))));
    }

    #[test]
    fn test_builder_requires_credentials() {
        let result = IdpClient::builder().api_base("https://tenant.example.com").build();
        assert!(matches!(result, Err(IdpError::Configuration(_))));
    }

    #[test]
    fn test_store_base_defaults_to_api_base() {
        let client = test_client("https://tenant.example.com");
        assert_eq!(client.store_base, "https://tenant.example.com");
    }

    #[test]
    fn test_store_base_override() {
        let client = IdpClient::builder()
            .api_base("https://tenant.example.com")
            .store_base("https://store.example.com")
            .client_id("id")
            .client_secret("secret")
            .build()
            .unwrap();
        assert_eq!(client.store_base, "https://store.example.com");
    }

    #[test]
    fn test_debug_redacts_client_secret() {
        let client = test_client("https://tenant.example.com");
        let debug = format!("{:?}", client);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("m2m-secret"));
    }
}
