//! Relationship store API: check, read, write.

use serde::{Deserialize, Serialize};

use crate::client::IdpClient;
use crate::error::IdpError;

/// A `(user, relation, object)` tuple on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TupleKey {
    pub user: String,
    pub relation: String,
    pub object: String,
}

impl TupleKey {
    pub fn new(
        user: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            relation: relation.into(),
            object: object.into(),
        }
    }
}

/// Request body for a membership check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckRequest {
    pub tuple_key: TupleKey,
}

/// Response body for a membership check.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckResponse {
    pub allowed: bool,
}

/// Request body for reading stored tuples matching a partial key.
///
/// `relation` is omitted to read every relation the user holds on the object.
#[derive(Debug, Clone, Serialize)]
pub struct ReadRequest {
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    pub object: String,
}

/// One stored tuple.
#[derive(Debug, Clone, Deserialize)]
pub struct TupleRecord {
    pub key: TupleKey,
}

/// Response body for a read.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadResponse {
    #[serde(default)]
    pub tuples: Vec<TupleRecord>,
}

/// Request body for a batched write.
///
/// Deletes of tuples the store does not hold are rejected with a 400; callers
/// read first and only delete what exists.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WriteRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub writes: Vec<TupleKey>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deletes: Vec<TupleKey>,
}

/// Relationship store API handle
pub struct Relationships<'a> {
    pub(crate) client: &'a IdpClient,
}

impl<'a> Relationships<'a> {
    /// Check whether the tuple's user holds the relation on the object.
    pub async fn check(&self, request: CheckRequest) -> Result<CheckResponse, IdpError> {
        let url = format!("{}/check", self.client.store_base);
        let bearer = self.client.bearer().await?;
        self.client
            .execute_with_retry(&url, Some(&request), reqwest::Method::POST, Some(&bearer))
            .await
    }

    /// Read stored tuples matching a partial key.
    pub async fn read(&self, request: ReadRequest) -> Result<ReadResponse, IdpError> {
        let url = format!("{}/read", self.client.store_base);
        let bearer = self.client.bearer().await?;
        self.client
            .execute_with_retry(&url, Some(&request), reqwest::Method::POST, Some(&bearer))
            .await
    }

    /// Apply a batch of writes and deletes.
    pub async fn write(&self, request: WriteRequest) -> Result<(), IdpError> {
        let url = format!("{}/write", self.client.store_base);
        let bearer = self.client.bearer().await?;
        self.client
            .execute_no_content(&url, Some(&request), reqwest::Method::POST, Some(&bearer))
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
    async fn test_check() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;

        Mock::given(method("POST"))
            .and(path("/check"))
            .and(body_partial_json(json!({
                "tuple_key": {"user": "user:u1", "relation": "can_view", "object": "organization:o1"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"allowed": true})))
            .mount(&server)
            .await;

        let response = client
            .relationships()
            .check(CheckRequest {
                tuple_key: TupleKey::new("user:u1", "can_view", "organization:o1"),
            })
            .await
            .unwrap();
        assert!(response.allowed);
    }

    #[tokio::test]
    async fn test_read_returns_tuples() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;

        Mock::given(method("POST"))
            .and(path("/read"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tuples": [
                    {"key": {"user": "user:u1", "relation": "admin", "object": "organization:o1"}},
                    {"key": {"user": "user:u1", "relation": "member", "object": "organization:o1"}}
                ]
            })))
            .mount(&server)
            .await;

        let response = client
            .relationships()
            .read(ReadRequest {
                user: "user:u1".to_string(),
                relation: None,
                object: "organization:o1".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(response.tuples.len(), 2);
        assert_eq!(response.tuples[0].key.relation, "admin");
    }

    #[tokio::test]
    async fn test_write_delete_of_missing_tuple_errors() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;

        Mock::given(method("POST"))
            .and(path("/write"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "cannot delete a relationship that does not exist"
            })))
            .mount(&server)
            .await;

        let result = client
            .relationships()
            .write(WriteRequest {
                writes: vec![],
                deletes: vec![TupleKey::new("user:u1", "admin", "organization:o1")],
            })
            .await;

        match result {
            Err(IdpError::InvalidRequest { status, message }) => {
                assert_eq!(status, 400);
                assert!(message.contains("does not exist"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
