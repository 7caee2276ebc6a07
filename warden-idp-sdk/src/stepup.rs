//! Step-up approval API: decoupled challenge initiate/poll.

use serde::{Deserialize, Serialize};

use crate::client::IdpClient;
use crate::error::IdpError;

/// Request body to open a challenge.
#[derive(Debug, Clone, Serialize)]
pub struct InitiateRequest {
    /// Subject the approval push is sent to.
    pub subject: String,
    /// Human-readable description shown on the enrolled device.
    pub binding_message: String,
}

/// Response to a challenge initiation.
#[derive(Debug, Clone, Deserialize)]
pub struct InitiateResponse {
    /// Provider-issued challenge id.
    pub auth_req_id: String,
    /// Seconds until the provider expires the challenge.
    pub expires_in: u64,
    /// Seconds the provider asks callers to wait between polls.
    pub interval: u64,
}

/// Decision states a poll can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    Pending,
    SlowDown,
    Approved,
    Denied,
    Expired,
}

/// Response to a poll.
#[derive(Debug, Clone, Deserialize)]
pub struct PollResponse {
    pub status: PollStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Step-up approval API handle
pub struct StepUp<'a> {
    pub(crate) client: &'a IdpClient,
}

impl<'a> StepUp<'a> {
    /// Open a new challenge for a subject.
    pub async fn initiate(&self, request: InitiateRequest) -> Result<InitiateResponse, IdpError> {
        let url = format!("{}/stepup/authorize", self.client.api_base);
        let bearer = self.client.bearer().await?;
        self.client
            .execute_with_retry(&url, Some(&request), reqwest::Method::POST, Some(&bearer))
            .await
    }

    /// Ask for the current decision on a challenge.
    pub async fn poll(&self, auth_req_id: &str) -> Result<PollResponse, IdpError> {
        let url = format!("{}/stepup/status", self.client.api_base);
        let body = serde_json::json!({ "auth_req_id": auth_req_id });
        let bearer = self.client.bearer().await?;
        self.client
            .execute_with_retry(&url, Some(&body), reqwest::Method::POST, Some(&bearer))
            .await
    }
}

#[cfg(test)]
mod wiremock_tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> IdpClient {
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "m2m-token", "expires_in": 3600
            })))
            .mount(server)
            .await;

        IdpClient::builder()
            .api_base(server.uri())
            .client_id("id")
            .client_secret("secret")
            .max_retries(0)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_initiate() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;

        Mock::given(method("POST"))
            .and(path("/stepup/authorize"))
            .and(body_partial_json(json!({"subject": "user:u1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "auth_req_id": "req-1", "expires_in": 300, "interval": 5
            })))
            .mount(&server)
            .await;

        let response = client
            .step_up()
            .initiate(InitiateRequest {
                subject: "user:u1".to_string(),
                binding_message: "Remove jo@example.com".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.auth_req_id, "req-1");
        assert_eq!(response.interval, 5);
    }

    #[tokio::test]
    async fn test_poll_statuses() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;

        Mock::given(method("POST"))
            .and(path("/stepup/status"))
            .and(body_partial_json(json!({"auth_req_id": "req-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "slow_down"
            })))
            .mount(&server)
            .await;

        let response = client.step_up().poll("req-1").await.unwrap();
        assert_eq!(response.status, PollStatus::SlowDown);
        assert_eq!(response.reason, None);
    }

    #[tokio::test]
    async fn test_poll_denied_carries_reason() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;

        Mock::given(method("POST"))
            .and(path("/stepup/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "denied", "reason": "declined on device"
            })))
            .mount(&server)
            .await;

        let response = client.step_up().poll("req-1").await.unwrap();
        assert_eq!(response.status, PollStatus::Denied);
        assert_eq!(response.reason.as_deref(), Some("declined on device"));
    }
}
