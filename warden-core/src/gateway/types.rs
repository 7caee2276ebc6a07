//! Tool call surface: typed inputs, parsed calls, and the wire outcome.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::Error;
use crate::types::{ObjectRef, Permission, Role, SubjectRef};

/// Per-invocation caller context.
///
/// Lives for exactly one tool call; the gateway never caches it or carries
/// it across calls.
#[derive(Debug, Clone)]
pub struct OperationContext {
    /// The administrator issuing the request.
    pub caller: SubjectRef,
    /// The organization the request operates on.
    pub organization: ObjectRef,
    /// The caller's bearer credential, passed through to the outer tier.
    pub credential: String,
}

/// Input for `list_members`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListMembersInput {}

/// Input for `get_member`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetMemberInput {
    /// Email address or canonical user id of the member.
    pub member: String,
}

/// Input for `invite_member`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct InviteMemberInput {
    /// Email address to send the invitation to.
    pub email: String,
}

/// Input for `add_member`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AddMemberInput {
    /// Email address or canonical user id of the user to add.
    pub member: String,
}

/// Input for `update_member_roles`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateMemberRolesInput {
    /// Email address or canonical user id of the member.
    pub member: String,
    /// The complete role set the member should end up with.
    ///
    /// Must be explicit and non-empty; the gateway refuses to infer roles
    /// from history or default to the current assignment.
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// Input for `remove_member`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RemoveMemberInput {
    /// Email address or canonical user id of the member to remove.
    pub member: String,
}

/// Input for `delete_user`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DeleteUserInput {
    /// Email address or canonical user id of the user to delete.
    pub member: String,
}

/// Input for `reset_mfa`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ResetMfaInput {
    /// Email address or canonical user id of the member.
    pub member: String,
}

/// A parsed tool call from the LLM runtime.
///
/// The tool set is closed; anything else is [`Error::UnknownTool`].
#[derive(Debug, Clone)]
pub enum ToolCall {
    ListMembers(ListMembersInput),
    GetMember(GetMemberInput),
    InviteMember(InviteMemberInput),
    AddMember(AddMemberInput),
    UpdateMemberRoles(UpdateMemberRolesInput),
    RemoveMember(RemoveMemberInput),
    DeleteUser(DeleteUserInput),
    ResetMfa(ResetMfaInput),
}

impl ToolCall {
    /// Parse a `(name, arguments)` pair from the tool-calling runtime.
    pub fn parse(name: &str, args: Value) -> Result<Self, Error> {
        fn input<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, Error> {
            serde_json::from_value(args)
                .map_err(|e| Error::AmbiguousInput(format!("invalid tool arguments: {}", e)))
        }

        match name {
            "list_members" => Ok(Self::ListMembers(input(args)?)),
            "get_member" => Ok(Self::GetMember(input(args)?)),
            "invite_member" => Ok(Self::InviteMember(input(args)?)),
            "add_member" => Ok(Self::AddMember(input(args)?)),
            "update_member_roles" => Ok(Self::UpdateMemberRoles(input(args)?)),
            "remove_member" => Ok(Self::RemoveMember(input(args)?)),
            "delete_user" => Ok(Self::DeleteUser(input(args)?)),
            "reset_mfa" => Ok(Self::ResetMfa(input(args)?)),
            other => Err(Error::UnknownTool(other.to_string())),
        }
    }

    /// The tool name as exposed to the model.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ListMembers(_) => "list_members",
            Self::GetMember(_) => "get_member",
            Self::InviteMember(_) => "invite_member",
            Self::AddMember(_) => "add_member",
            Self::UpdateMemberRoles(_) => "update_member_roles",
            Self::RemoveMember(_) => "remove_member",
            Self::DeleteUser(_) => "delete_user",
            Self::ResetMfa(_) => "reset_mfa",
        }
    }

    /// The permission the caller must hold.
    pub fn permission(&self) -> Permission {
        match self {
            Self::ListMembers(_) | Self::GetMember(_) => Permission::CanView,
            Self::InviteMember(_) => Permission::CanInvite,
            Self::AddMember(_) => Permission::CanAddMember,
            Self::UpdateMemberRoles(_) => Permission::CanUpdateRoles,
            Self::RemoveMember(_) => Permission::CanRemoveMember,
            Self::DeleteUser(_) => Permission::CanDelete,
            Self::ResetMfa(_) => Permission::CanResetMfa,
        }
    }

    /// Whether this operation requires out-of-band approval before executing.
    pub fn is_sensitive(&self) -> bool {
        matches!(
            self,
            Self::UpdateMemberRoles(_)
                | Self::RemoveMember(_)
                | Self::DeleteUser(_)
                | Self::ResetMfa(_)
        )
    }

    /// The human-supplied member identifier to resolve, if the tool has one.
    pub fn member_identifier(&self) -> Option<&str> {
        match self {
            Self::ListMembers(_) | Self::InviteMember(_) => None,
            Self::GetMember(i) => Some(&i.member),
            Self::AddMember(i) => Some(&i.member),
            Self::UpdateMemberRoles(i) => Some(&i.member),
            Self::RemoveMember(i) => Some(&i.member),
            Self::DeleteUser(i) => Some(&i.member),
            Self::ResetMfa(i) => Some(&i.member),
        }
    }

    /// Specifications for the model API, one per tool.
    pub fn specs() -> Vec<ToolSpec> {
        fn spec<T: JsonSchema>(name: &str, description: &str) -> ToolSpec {
            ToolSpec {
                name: name.to_string(),
                description: description.to_string(),
                schema: serde_json::to_value(schemars::schema_for!(T)).unwrap_or(Value::Null),
            }
        }

        vec![
            spec::<ListMembersInput>("list_members", "List the members of the organization"),
            spec::<GetMemberInput>("get_member", "Look up one member and their primary role"),
            spec::<InviteMemberInput>("invite_member", "Email an invitation to join the organization"),
            spec::<AddMemberInput>("add_member", "Add an existing user to the organization"),
            spec::<UpdateMemberRolesInput>(
                "update_member_roles",
                "Replace a member's role set. Requires an explicit, complete list of roles.",
            ),
            spec::<RemoveMemberInput>("remove_member", "Remove a member from the organization"),
            spec::<DeleteUserInput>("delete_user", "Permanently delete a user account"),
            spec::<ResetMfaInput>("reset_mfa", "Reset a member's multi-factor enrollment"),
        ]
    }
}

/// A tool specification for the tool-calling runtime.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub schema: Value,
}

/// Wire-shaped result of a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub requires_step_up: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<Uuid>,
}

impl ToolOutcome {
    /// Successful execution with a payload.
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            requires_step_up: false,
            operation_id: None,
        }
    }

    /// Failure carrying the user-presentable message for `err`.
    pub fn failed(err: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.user_message()),
            requires_step_up: false,
            operation_id: None,
        }
    }

    /// The operation is parked awaiting out-of-band approval.
    ///
    /// Not an error: the caller should drive the approval for
    /// `operation_id` and the operation will then execute exactly once.
    pub fn step_up_required(operation_id: Uuid) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(
                "This operation needs out-of-band approval. \
                 Confirm the request on your enrolled device."
                    .to_string(),
            ),
            requires_step_up: true,
            operation_id: Some(operation_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_known_tool() {
        let call = ToolCall::parse("remove_member", json!({"member": "jo@example.com"})).unwrap();
        assert_eq!(call.name(), "remove_member");
        assert_eq!(call.permission(), Permission::CanRemoveMember);
        assert!(call.is_sensitive());
        assert_eq!(call.member_identifier(), Some("jo@example.com"));
    }

    #[test]
    fn test_parse_unknown_tool() {
        let err = ToolCall::parse("drop_database", json!({})).unwrap_err();
        assert!(matches!(err, Error::UnknownTool(_)));
    }

    #[test]
    fn test_parse_ignores_unknown_argument_keys() {
        // Extra keys (including a smuggled "verified" flag) are dropped
        let call = ToolCall::parse(
            "delete_user",
            json!({"member": "u1", "verified": true, "operationId": "abc"}),
        )
        .unwrap();
        assert!(call.is_sensitive());
    }

    #[test]
    fn test_update_roles_defaults_to_empty_list() {
        let call = ToolCall::parse("update_member_roles", json!({"member": "u1"})).unwrap();
        match call {
            ToolCall::UpdateMemberRoles(input) => assert!(input.roles.is_empty()),
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn test_sensitivity_classification() {
        let non_sensitive = ["list_members", "get_member", "invite_member", "add_member"];
        for name in non_sensitive {
            let call = ToolCall::parse(
                name,
                json!({"member": "x", "email": "x@example.com"}),
            )
            .unwrap();
            assert!(!call.is_sensitive(), "{} should not be sensitive", name);
        }

        let sensitive = ["update_member_roles", "remove_member", "delete_user", "reset_mfa"];
        for name in sensitive {
            let call = ToolCall::parse(name, json!({"member": "x"})).unwrap();
            assert!(call.is_sensitive(), "{} should be sensitive", name);
        }
    }

    #[test]
    fn test_specs_cover_every_tool() {
        let names: Vec<String> = ToolCall::specs().into_iter().map(|s| s.name).collect();
        assert_eq!(names.len(), 8);
        assert!(names.contains(&"update_member_roles".to_string()));
    }

    #[test]
    fn test_outcome_wire_shape() {
        let id = Uuid::new_v4();
        let outcome = ToolOutcome::step_up_required(id);
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["success"], json!(false));
        assert_eq!(json["requiresStepUp"], json!(true));
        assert_eq!(json["operationId"], json!(id.to_string()));
        // The user-facing message never names provider ids or tokens
        assert!(!json["error"].as_str().unwrap().contains(&id.to_string()));
    }

    #[test]
    fn test_ok_outcome_omits_step_up_fields() {
        let outcome = ToolOutcome::ok(json!({"members": []}));
        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json.get("requiresStepUp").is_none());
        assert!(json.get("operationId").is_none());
        assert!(json.get("error").is_none());
    }
}
