//! Request handlers for the warden endpoints.

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use warden_core::{ActivityRecord, ObjectRef, OperationContext, SubjectRef, ToolOutcome};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Body of a tool invocation request.
#[derive(Debug, Deserialize)]
pub struct ToolInvocation {
    /// Canonical id of the calling administrator.
    pub caller_id: String,
    /// Id of the organization the call operates on.
    pub organization_id: String,
    /// Tool arguments as produced by the tool-calling runtime.
    #[serde(default)]
    pub args: Value,
}

/// `POST /{tools}/:name` - dispatch one tool call through the gateway.
///
/// The response is always the gateway's [`ToolOutcome`]; denials and parked
/// sensitive operations are results, not HTTP errors.
pub async fn invoke_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(body): Json<ToolInvocation>,
) -> ServerResult<Json<ToolOutcome>> {
    let credential = bearer_credential(&headers)?;

    let mut args = body.args;
    strip_verification_claims(&mut args);

    let ctx = OperationContext {
        caller: SubjectRef::user(&body.caller_id),
        organization: ObjectRef::organization(&body.organization_id),
        credential,
    };

    Ok(Json(state.gateway.dispatch_raw(&name, args, &ctx).await))
}

/// `POST /{operations}/:id/approve` - drive the step-up flow for a parked
/// operation and execute it on approval.
pub async fn approve_operation(
    State(state): State<AppState>,
    Path(operation_id): Path<Uuid>,
    headers: HeaderMap,
) -> ServerResult<Json<ToolOutcome>> {
    bearer_credential(&headers)?;
    Ok(Json(state.gateway.approve_and_execute(operation_id).await))
}

/// `GET /{activity}` - the activity feed, newest first.
pub async fn activity_feed(
    State(state): State<AppState>,
) -> ServerResult<Json<Vec<ActivityRecord>>> {
    Ok(Json(state.gateway.activity().snapshot()))
}

/// `DELETE /{activity}` - clear the activity feed.
pub async fn clear_activity(State(state): State<AppState>) -> StatusCode {
    state.gateway.activity().clear();
    StatusCode::NO_CONTENT
}

fn bearer_credential(headers: &HeaderMap) -> ServerResult<String> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServerError::Unauthorized("missing bearer token".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ServerError::Unauthorized("missing bearer token".to_string()))
}

/// Drop any wire-level claim of prior verification.
///
/// Verification state is derived server-side by the step-up flow; a request
/// field saying "already verified" is untrusted input, always.
fn strip_verification_claims(args: &mut Value) {
    let Some(map) = args.as_object_mut() else {
        return;
    };
    for key in ["verified", "operationId", "operation_id"] {
        if map.remove(key).is_some() {
            log::warn!("discarded client-supplied '{}' field from tool arguments", key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bearer_credential_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer tok-123".parse().unwrap());
        assert_eq!(bearer_credential(&headers).unwrap(), "tok-123");
    }

    #[test]
    fn test_bearer_credential_missing() {
        let headers = HeaderMap::new();
        assert!(bearer_credential(&headers).is_err());

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic dXNlcg==".parse().unwrap());
        assert!(bearer_credential(&headers).is_err());

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert!(bearer_credential(&headers).is_err());
    }

    #[test]
    fn test_strip_verification_claims() {
        let mut args = json!({
            "member": "jo@example.com",
            "verified": true,
            "operationId": "11111111-1111-1111-1111-111111111111",
            "operation_id": "x",
        });
        strip_verification_claims(&mut args);
        assert_eq!(args, json!({"member": "jo@example.com"}));
    }

    #[test]
    fn test_strip_verification_claims_non_object() {
        let mut args = json!("not an object");
        strip_verification_claims(&mut args);
        assert_eq!(args, json!("not an object"));
    }
}
