//! Identifier, role, and relation types shared by the evaluator and mutator.
//!
//! Role and permission names form a closed set. Permissions are *computed*
//! relations - a permission holds for a subject when the subject holds any of
//! the roles in that permission's union - and are therefore readable but never
//! writable. The write path ([`RoleAssignment`]) only admits roles, so a
//! permission tuple cannot be written or deleted by construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when parsing identifiers or relation names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ParseError(String);

impl ParseError {
    fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Opaque namespaced identifier in `type:id` form (e.g. `user:auth0|abc123`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectRef(String);

impl SubjectRef {
    /// Create a subject in the `user` namespace.
    pub fn user(id: impl AsRef<str>) -> Self {
        Self(format!("user:{}", id.as_ref()))
    }

    /// Create a subject from an explicit namespace and id.
    pub fn new(namespace: &str, id: &str) -> Self {
        Self(format!("{}:{}", namespace, id))
    }

    /// The full `type:id` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id portion (everything after the first `:`).
    pub fn id(&self) -> &str {
        self.0.split_once(':').map(|(_, id)| id).unwrap_or(&self.0)
    }
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SubjectRef {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((ns, id)) if !ns.is_empty() && !id.is_empty() => Ok(Self(s.to_string())),
            _ => Err(ParseError::new(format!(
                "subject must be in type:id form, got '{}'",
                s
            ))),
        }
    }
}

/// Opaque namespaced identifier for the resource a relation applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectRef(String);

impl ObjectRef {
    /// Create an object in the `organization` namespace.
    pub fn organization(id: impl AsRef<str>) -> Self {
        Self(format!("organization:{}", id.as_ref()))
    }

    /// Create an object from an explicit namespace and id.
    pub fn new(namespace: &str, id: &str) -> Self {
        Self(format!("{}:{}", namespace, id))
    }

    /// The full `type:id` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id portion (everything after the first `:`).
    pub fn id(&self) -> &str {
        self.0.split_once(':').map(|(_, id)| id).unwrap_or(&self.0)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectRef {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((ns, id)) if !ns.is_empty() && !id.is_empty() => Ok(Self(s.to_string())),
            _ => Err(ParseError::new(format!(
                "object must be in type:id form, got '{}'",
                s
            ))),
        }
    }
}

/// Role relations a subject can hold on an object.
///
/// A subject may hold zero, one, or several roles on the same object at once;
/// nothing in the model makes roles mutually exclusive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Support,
    Member,
}

impl Role {
    /// All roles, ordered by display precedence (highest first).
    ///
    /// Precedence is only used to derive a single "primary role" label;
    /// permission computation uses the per-permission unions instead.
    pub const PRECEDENCE: [Role; 4] = [Role::SuperAdmin, Role::Admin, Role::Support, Role::Member];

    /// The relation name as stored in the relationship store.
    pub fn as_relation(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Support => "support",
            Role::Member => "member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_relation())
    }
}

impl FromStr for Role {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Role::SuperAdmin),
            "admin" => Ok(Role::Admin),
            "support" => Ok(Role::Support),
            "member" => Ok(Role::Member),
            other => Err(ParseError::new(format!("unknown role '{}'", other))),
        }
    }
}

/// Permission relations, each defined as a union over roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    CanView,
    CanResetMfa,
    CanInvite,
    CanAddMember,
    CanUpdateRoles,
    CanRemoveMember,
    CanDelete,
}

impl Permission {
    /// Every permission in the model.
    pub const ALL: [Permission; 7] = [
        Permission::CanView,
        Permission::CanResetMfa,
        Permission::CanInvite,
        Permission::CanAddMember,
        Permission::CanUpdateRoles,
        Permission::CanRemoveMember,
        Permission::CanDelete,
    ];

    /// The relation name as checked against the relationship store.
    pub fn as_relation(&self) -> &'static str {
        match self {
            Permission::CanView => "can_view",
            Permission::CanResetMfa => "can_reset_mfa",
            Permission::CanInvite => "can_invite",
            Permission::CanAddMember => "can_add_member",
            Permission::CanUpdateRoles => "can_update_roles",
            Permission::CanRemoveMember => "can_remove_member",
            Permission::CanDelete => "can_delete",
        }
    }

    /// The roles whose union defines this permission.
    pub fn granting_roles(&self) -> &'static [Role] {
        match self {
            Permission::CanView => &[Role::SuperAdmin, Role::Admin, Role::Support, Role::Member],
            Permission::CanResetMfa => &[Role::SuperAdmin, Role::Admin, Role::Support],
            Permission::CanInvite => &[Role::SuperAdmin, Role::Admin],
            Permission::CanAddMember => &[Role::SuperAdmin, Role::Admin],
            Permission::CanUpdateRoles => &[Role::SuperAdmin, Role::Admin],
            Permission::CanRemoveMember => &[Role::SuperAdmin, Role::Admin],
            Permission::CanDelete => &[Role::SuperAdmin],
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_relation())
    }
}

impl FromStr for Permission {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "can_view" => Ok(Permission::CanView),
            "can_reset_mfa" => Ok(Permission::CanResetMfa),
            "can_invite" => Ok(Permission::CanInvite),
            "can_add_member" => Ok(Permission::CanAddMember),
            "can_update_roles" => Ok(Permission::CanUpdateRoles),
            "can_remove_member" => Ok(Permission::CanRemoveMember),
            "can_delete" => Ok(Permission::CanDelete),
            other => Err(ParseError::new(format!("unknown permission '{}'", other))),
        }
    }
}

/// Any relation name that can appear in a `check` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Relation {
    Role(Role),
    Permission(Permission),
}

impl Relation {
    /// The relation name on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Role(r) => r.as_relation(),
            Relation::Permission(p) => p.as_relation(),
        }
    }

    /// Whether this relation may be written or deleted.
    pub fn is_role(&self) -> bool {
        matches!(self, Relation::Role(_))
    }
}

impl From<Role> for Relation {
    fn from(role: Role) -> Self {
        Relation::Role(role)
    }
}

impl From<Permission> for Relation {
    fn from(permission: Permission) -> Self {
        Relation::Permission(permission)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Relation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(role) = s.parse::<Role>() {
            return Ok(Relation::Role(role));
        }
        if let Ok(permission) = s.parse::<Permission>() {
            return Ok(Relation::Permission(permission));
        }
        Err(ParseError::new(format!("unknown relation '{}'", s)))
    }
}

/// A writable relationship tuple: `(subject, role, object)`.
///
/// This is the only shape the store's write path accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub subject: SubjectRef,
    pub role: Role,
    pub object: ObjectRef,
}

impl RoleAssignment {
    pub fn new(subject: SubjectRef, role: Role, object: ObjectRef) -> Self {
        Self {
            subject,
            role,
            object,
        }
    }
}

impl fmt::Display for RoleAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.role, self.object)
    }
}
