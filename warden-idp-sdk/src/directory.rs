//! Directory/management API: users, org membership, roles, MFA.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::IdpClient;
use crate::error::IdpError;

/// A user record from the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUser {
    pub user_id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Body for a membership change.
#[derive(Debug, Clone, Serialize)]
struct MembersBody {
    members: Vec<String>,
}

/// Directory/management API handle
pub struct Directory<'a> {
    pub(crate) client: &'a IdpClient,
}

impl<'a> Directory<'a> {
    /// Look up users by exact email address.
    pub async fn users_by_email(&self, email: &str) -> Result<Vec<ApiUser>, IdpError> {
        let url = format!(
            "{}/api/v2/users-by-email?email={}",
            self.client.api_base,
            urlencode(email)
        );
        let bearer = self.client.bearer().await?;
        self.client
            .execute_with_retry::<_, ()>(&url, None, reqwest::Method::GET, Some(&bearer))
            .await
    }

    /// Fetch one user by canonical id.
    pub async fn get_user(&self, user_id: &str) -> Result<ApiUser, IdpError> {
        let url = format!(
            "{}/api/v2/users/{}",
            self.client.api_base,
            urlencode(user_id)
        );
        let bearer = self.client.bearer().await?;
        self.client
            .execute_with_retry::<_, ()>(&url, None, reqwest::Method::GET, Some(&bearer))
            .await
    }

    /// List the members of an organization.
    pub async fn list_members(&self, org_id: &str) -> Result<Vec<ApiUser>, IdpError> {
        let url = format!(
            "{}/api/v2/organizations/{}/members",
            self.client.api_base,
            urlencode(org_id)
        );
        let bearer = self.client.bearer().await?;
        self.client
            .execute_with_retry::<_, ()>(&url, None, reqwest::Method::GET, Some(&bearer))
            .await
    }

    /// Create an email invitation for an organization.
    pub async fn create_invitation(&self, org_id: &str, email: &str) -> Result<(), IdpError> {
        let url = format!(
            "{}/api/v2/organizations/{}/invitations",
            self.client.api_base,
            urlencode(org_id)
        );
        let body = json!({ "invitee": { "email": email } });
        let bearer = self.client.bearer().await?;
        self.client
            .execute_no_content(&url, Some(&body), reqwest::Method::POST, Some(&bearer))
            .await
    }

    /// Add an existing user to an organization.
    pub async fn add_member(&self, org_id: &str, user_id: &str) -> Result<(), IdpError> {
        let url = format!(
            "{}/api/v2/organizations/{}/members",
            self.client.api_base,
            urlencode(org_id)
        );
        let body = MembersBody {
            members: vec![user_id.to_string()],
        };
        let bearer = self.client.bearer().await?;
        self.client
            .execute_no_content(&url, Some(&body), reqwest::Method::POST, Some(&bearer))
            .await
    }

    /// Replace a member's role list.
    pub async fn set_member_roles(
        &self,
        org_id: &str,
        user_id: &str,
        roles: &[String],
    ) -> Result<(), IdpError> {
        let url = format!(
            "{}/api/v2/organizations/{}/members/{}/roles",
            self.client.api_base,
            urlencode(org_id),
            urlencode(user_id)
        );
        let body = json!({ "roles": roles });
        let bearer = self.client.bearer().await?;
        self.client
            .execute_no_content(&url, Some(&body), reqwest::Method::PUT, Some(&bearer))
            .await
    }

    /// Remove a user from an organization.
    pub async fn remove_member(&self, org_id: &str, user_id: &str) -> Result<(), IdpError> {
        let url = format!(
            "{}/api/v2/organizations/{}/members",
            self.client.api_base,
            urlencode(org_id)
        );
        let body = MembersBody {
            members: vec![user_id.to_string()],
        };
        let bearer = self.client.bearer().await?;
        self.client
            .execute_no_content(&url, Some(&body), reqwest::Method::DELETE, Some(&bearer))
            .await
    }

    /// Delete a user account entirely.
    pub async fn delete_user(&self, user_id: &str) -> Result<(), IdpError> {
        let url = format!(
            "{}/api/v2/users/{}",
            self.client.api_base,
            urlencode(user_id)
        );
        let bearer = self.client.bearer().await?;
        self.client
            .execute_no_content::<()>(&url, None, reqwest::Method::DELETE, Some(&bearer))
            .await
    }

    /// Remove all of a user's MFA authenticators.
    pub async fn reset_mfa(&self, user_id: &str) -> Result<(), IdpError> {
        let url = format!(
            "{}/api/v2/users/{}/authenticators",
            self.client.api_base,
            urlencode(user_id)
        );
        let bearer = self.client.bearer().await?;
        self.client
            .execute_no_content::<()>(&url, None, reqwest::Method::DELETE, Some(&bearer))
            .await
    }
}

/// Percent-encode the characters that appear in directory ids and emails.
fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}


#[cfg(test)]
mod wiremock_tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
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
    async fn test_users_by_email() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;

        Mock::given(method("GET"))
            .and(path("/api/v2/users-by-email"))
            .and(query_param("email", "jo@example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"user_id": "jo-id", "email": "jo@example.com", "name": "Jo"}
            ])))
            .mount(&server)
            .await;

        let users = client
            .directory()
            .users_by_email("jo@example.com")
            .await
            .unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].user_id, "jo-id");
    }

    #[tokio::test]
    async fn test_set_member_roles_puts_role_list() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;

        Mock::given(method("PUT"))
            .and(path("/api/v2/organizations/o1/members/jo-id/roles"))
            .and(body_partial_json(json!({"roles": ["admin", "support"]})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client
            .directory()
            .set_member_roles("o1", "jo-id", &["admin".to_string(), "support".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_remove_member_sends_delete_with_body() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;

        Mock::given(method("DELETE"))
            .and(path("/api/v2/organizations/o1/members"))
            .and(body_partial_json(json!({"members": ["jo-id"]})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client.directory().remove_member("o1", "jo-id").await.unwrap();
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;

        Mock::given(method("GET"))
            .and(path("/api/v2/users/ghost"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"error": "not_found", "message": "no such user"})),
            )
            .mount(&server)
            .await;

        let err = client.directory().get_user("ghost").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }
}
