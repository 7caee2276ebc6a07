//! Tool dispatch with permission gating and step-up parking.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use uuid::Uuid;

use super::directory::{DirectoryApi, DirectoryUser};
use super::types::{OperationContext, ToolCall, ToolOutcome};
use crate::activity::ActivityLog;
use crate::error::Error;
use crate::events::{GatewayEvent, GatewayHook, HookId};
use crate::rebac::{PermissionEvaluator, RelationshipMutator, RelationshipStore};
use crate::stepup::{StepUpConfig, StepUpFlow, StepUpProvider};
use crate::types::{Role, SubjectRef};

/// How long a parked sensitive operation stays approvable.
pub const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(600);

/// A sensitive operation parked until its step-up flow completes.
struct PendingOperation {
    call: ToolCall,
    ctx: OperationContext,
    target: Option<DirectoryUser>,
    created_at: DateTime<Utc>,
}

/// Dispatch layer between the LLM tool-calling runtime and the external
/// systems.
///
/// Every call is resolved, permission-checked, and - when sensitive - parked
/// behind an out-of-band approval before anything executes. Nothing a caller
/// puts on the wire can mark a call as verified: execution of a parked
/// operation happens only through [`ToolGateway::approve_and_execute`], which
/// drives the step-up flow on the server and consumes the parked operation
/// exactly once.
pub struct ToolGateway {
    evaluator: PermissionEvaluator,
    mutator: RelationshipMutator,
    directory: Arc<dyn DirectoryApi>,
    stepup: StepUpFlow,
    activity: Arc<ActivityLog>,
    pending: Mutex<HashMap<Uuid, PendingOperation>>,
    pending_ttl: Duration,
    hooks: RwLock<Vec<(HookId, Arc<dyn GatewayHook>)>>,
    next_hook_id: AtomicU64,
}

impl ToolGateway {
    /// Create a builder for gateway configuration.
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// The shared activity feed.
    pub fn activity(&self) -> Arc<ActivityLog> {
        self.activity.clone()
    }

    /// The permission evaluator, for read-only callers (e.g. dashboards).
    pub fn evaluator(&self) -> &PermissionEvaluator {
        &self.evaluator
    }

    /// Number of operations currently parked for approval.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Register an observer for gateway events.
    pub fn add_hook(&self, hook: impl GatewayHook + 'static) -> HookId {
        let id = HookId(self.next_hook_id.fetch_add(1, Ordering::SeqCst));
        self.hooks.write().push((id, Arc::new(hook)));
        id
    }

    /// Remove a previously registered hook.
    pub fn remove_hook(&self, id: HookId) -> bool {
        let mut hooks = self.hooks.write();
        let before = hooks.len();
        hooks.retain(|(hook_id, _)| *hook_id != id);
        hooks.len() < before
    }

    fn emit(&self, event: &GatewayEvent) {
        for (_, hook) in self.hooks.read().iter() {
            hook.on_event(event);
        }
    }

    /// Parse and dispatch a raw `(name, arguments)` pair from the runtime.
    pub async fn dispatch_raw(
        &self,
        name: &str,
        args: Value,
        ctx: &OperationContext,
    ) -> ToolOutcome {
        match ToolCall::parse(name, args) {
            Ok(call) => self.dispatch(call, ctx).await,
            Err(e) => ToolOutcome::failed(&e),
        }
    }

    /// Dispatch one tool call.
    ///
    /// Sensitive operations return [`ToolOutcome::step_up_required`] instead
    /// of executing; drive [`Self::approve_and_execute`] with the returned
    /// operation id to complete them.
    pub async fn dispatch(&self, call: ToolCall, ctx: &OperationContext) -> ToolOutcome {
        let name = call.name().to_string();
        self.emit(&GatewayEvent::ToolRequested {
            name: name.clone(),
            caller: ctx.caller.clone(),
        });

        let outcome = self.admit(call, ctx).await;
        if !outcome.requires_step_up {
            self.emit(&GatewayEvent::ToolCompleted {
                name,
                success: outcome.success,
            });
        }
        outcome
    }

    async fn admit(&self, call: ToolCall, ctx: &OperationContext) -> ToolOutcome {
        // Role updates must carry an explicit target set from the current
        // turn; defaulting or inferring here would let a stale model turn
        // rewrite someone's access.
        if let ToolCall::UpdateMemberRoles(input) = &call {
            if input.roles.is_empty() {
                return ToolOutcome::failed(&Error::AmbiguousInput(
                    "update_member_roles requires an explicit, non-empty role list".to_string(),
                ));
            }
        }

        let target = match self.resolve_target(&call).await {
            Ok(target) => target,
            Err(e) => return ToolOutcome::failed(&e),
        };

        // Permission gate comes before any step-up prompt: a caller is never
        // asked to approve an operation they are not allowed to request.
        let permission = call.permission();
        let allowed = self
            .evaluator
            .check(&ctx.caller, &ctx.organization, permission)
            .await;
        self.emit(&GatewayEvent::PermissionChecked {
            permission,
            allowed,
        });
        if !allowed {
            return ToolOutcome::failed(&Error::Forbidden { permission });
        }

        if call.is_sensitive() {
            let operation_id = Uuid::new_v4();
            let name = call.name().to_string();
            self.park(
                operation_id,
                PendingOperation {
                    call,
                    ctx: ctx.clone(),
                    target,
                    created_at: Utc::now(),
                },
            );
            self.emit(&GatewayEvent::StepUpRequired { operation_id, name });
            return ToolOutcome::step_up_required(operation_id);
        }

        match self.execute(&call, ctx, target.as_ref()).await {
            Ok(data) => ToolOutcome::ok(data),
            Err(e) => ToolOutcome::failed(&e),
        }
    }

    /// Drive the step-up flow for a parked operation and execute it on
    /// approval.
    ///
    /// The parked operation is removed before the flow starts, so an
    /// operation id is usable at most once - approved, denied, or expired,
    /// the caller must go through [`Self::dispatch`] again for another
    /// attempt, which opens a fresh challenge.
    pub async fn approve_and_execute(&self, operation_id: Uuid) -> ToolOutcome {
        let Some(op) = self.take_pending(operation_id) else {
            return ToolOutcome::failed(&Error::NotFound {
                identifier: format!("operation {}", operation_id),
            });
        };

        let message = binding_message(&op);
        match self
            .stepup
            .complete(&op.ctx.caller, &message, operation_id)
            .await
        {
            Ok(approval) => {
                self.emit(&GatewayEvent::StepUpResolved {
                    operation_id,
                    approved: true,
                });
                // Scope check: the minted approval covers exactly this
                // operation instance.
                if approval.operation_id() != operation_id {
                    return ToolOutcome::failed(&Error::Internal(
                        "approval scope mismatch".to_string(),
                    ));
                }

                // Permission was checked when the operation was parked;
                // the approval covers this instance, so execute directly.
                let name = op.call.name().to_string();
                let outcome = match self.execute(&op.call, &op.ctx, op.target.as_ref()).await {
                    Ok(data) => ToolOutcome::ok(data),
                    Err(e) => ToolOutcome::failed(&e),
                };
                self.emit(&GatewayEvent::ToolCompleted {
                    name,
                    success: outcome.success,
                });
                outcome
            }
            Err(e) => {
                self.emit(&GatewayEvent::StepUpResolved {
                    operation_id,
                    approved: false,
                });
                ToolOutcome::failed(&e.into())
            }
        }
    }

    async fn resolve_target(&self, call: &ToolCall) -> Result<Option<DirectoryUser>, Error> {
        let Some(identifier) = call.member_identifier() else {
            return Ok(None);
        };

        match self.directory.resolve_subject(identifier).await {
            Ok(Some(user)) => Ok(Some(user)),
            Ok(None) => Err(Error::NotFound {
                identifier: identifier.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Run the operation against the external systems.
    ///
    /// Ordering is fixed: the management API mutates first, the relationship
    /// store synchronizes second. There is no compensating rollback - a sync
    /// failure after the API succeeded is surfaced through the log and the
    /// [`GatewayEvent::StoreSyncIssue`] event, never hidden and never fatal
    /// to the already-completed operation.
    async fn execute(
        &self,
        call: &ToolCall,
        ctx: &OperationContext,
        target: Option<&DirectoryUser>,
    ) -> Result<Value, Error> {
        let org = ctx.organization.id();

        match call {
            ToolCall::ListMembers(_) => {
                let members = self.directory.list_members(org).await?;
                Ok(json!({ "members": members }))
            }
            ToolCall::GetMember(_) => {
                let user = required_target(target)?;
                let subject = SubjectRef::user(&user.user_id);
                let primary_role = self
                    .evaluator
                    .primary_role(&subject, &ctx.organization)
                    .await;
                Ok(json!({ "member": user, "primaryRole": primary_role }))
            }
            ToolCall::InviteMember(input) => {
                self.directory.invite_member(org, &input.email).await?;
                Ok(json!({ "invited": input.email }))
            }
            ToolCall::AddMember(_) => {
                let user = required_target(target)?;
                self.directory.add_member(org, &user.user_id).await?;

                let subject = SubjectRef::user(&user.user_id);
                if let Err(e) = self
                    .mutator
                    .grant(&subject, &ctx.organization, Role::Member)
                    .await
                {
                    self.note_sync_issue(format!(
                        "member role grant for {} failed after add: {}",
                        subject, e
                    ));
                }
                Ok(json!({ "added": user.email }))
            }
            ToolCall::UpdateMemberRoles(input) => {
                let user = required_target(target)?;
                self.directory
                    .set_member_roles(org, &user.user_id, &input.roles)
                    .await?;

                let subject = SubjectRef::user(&user.user_id);
                let desired: HashSet<Role> = input.roles.iter().copied().collect();
                match self
                    .mutator
                    .set_roles(&subject, &ctx.organization, &desired)
                    .await
                {
                    Ok(report) if !report.verified => {
                        self.note_sync_issue(format!(
                            "role sync for {} did not verify against the desired set",
                            subject
                        ));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        self.note_sync_issue(format!(
                            "role sync for {} failed after directory update: {}",
                            subject, e
                        ));
                    }
                }
                Ok(json!({ "member": user.email, "roles": input.roles }))
            }
            ToolCall::RemoveMember(_) => {
                let user = required_target(target)?;
                self.directory.remove_member(org, &user.user_id).await?;

                let subject = SubjectRef::user(&user.user_id);
                if let Err(e) = self.mutator.revoke_all(&subject, &ctx.organization).await {
                    self.note_sync_issue(format!(
                        "role cleanup for {} failed after removal: {}",
                        subject, e
                    ));
                }
                Ok(json!({ "removed": user.email }))
            }
            ToolCall::DeleteUser(_) => {
                let user = required_target(target)?;
                self.directory.delete_user(&user.user_id).await?;

                let subject = SubjectRef::user(&user.user_id);
                if let Err(e) = self.mutator.revoke_all(&subject, &ctx.organization).await {
                    self.note_sync_issue(format!(
                        "role cleanup for {} failed after deletion: {}",
                        subject, e
                    ));
                }
                Ok(json!({ "deleted": user.email }))
            }
            ToolCall::ResetMfa(_) => {
                let user = required_target(target)?;
                self.directory.reset_mfa(&user.user_id).await?;
                Ok(json!({ "mfaReset": user.email }))
            }
        }
    }

    fn note_sync_issue(&self, message: String) {
        log::warn!("store synchronization: {}", message);
        self.emit(&GatewayEvent::StoreSyncIssue { message });
    }

    fn park(&self, operation_id: Uuid, op: PendingOperation) {
        self.pending.lock().insert(operation_id, op);
    }

    fn take_pending(&self, operation_id: Uuid) -> Option<PendingOperation> {
        let mut pending = self.pending.lock();
        let ttl = chrono::Duration::from_std(self.pending_ttl).unwrap_or(chrono::Duration::zero());
        let cutoff = Utc::now() - ttl;
        pending.retain(|_, op| op.created_at > cutoff);
        pending.remove(&operation_id)
    }
}

fn required_target(target: Option<&DirectoryUser>) -> Result<&DirectoryUser, Error> {
    target.ok_or_else(|| Error::Internal("member target was not resolved".to_string()))
}

/// Human-readable description pushed to the subject's device.
fn binding_message(op: &PendingOperation) -> String {
    let who = op
        .target
        .as_ref()
        .map(|user| user.email.clone())
        .unwrap_or_else(|| "unknown user".to_string());
    let org = op.ctx.organization.id();

    match &op.call {
        ToolCall::UpdateMemberRoles(input) => {
            let roles: Vec<&str> = input.roles.iter().map(|r| r.as_relation()).collect();
            format!("Set roles for {} in {} to [{}]", who, org, roles.join(", "))
        }
        ToolCall::RemoveMember(_) => format!("Remove {} from {}", who, org),
        ToolCall::DeleteUser(_) => format!("Permanently delete the account of {}", who),
        ToolCall::ResetMfa(_) => format!("Reset multi-factor enrollment for {}", who),
        other => format!("Approve {} for {}", other.name(), who),
    }
}

/// Builder for [`ToolGateway`] configuration.
///
/// # Example
///
/// ```ignore
/// let gateway = ToolGateway::builder()
///     .with_store(store)
///     .with_directory(directory)
///     .with_step_up_provider(provider)
///     .build()?;
/// ```
pub struct GatewayBuilder {
    store: Option<Arc<dyn RelationshipStore>>,
    directory: Option<Arc<dyn DirectoryApi>>,
    stepup_provider: Option<Arc<dyn StepUpProvider>>,
    stepup_config: StepUpConfig,
    pending_ttl: Duration,
}

impl GatewayBuilder {
    fn new() -> Self {
        Self {
            store: None,
            directory: None,
            stepup_provider: None,
            stepup_config: StepUpConfig::default(),
            pending_ttl: DEFAULT_PENDING_TTL,
        }
    }

    /// Set the relationship store backend.
    pub fn with_store(mut self, store: Arc<dyn RelationshipStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the directory/management API backend.
    pub fn with_directory(mut self, directory: Arc<dyn DirectoryApi>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Set the out-of-band approval provider.
    pub fn with_step_up_provider(mut self, provider: Arc<dyn StepUpProvider>) -> Self {
        self.stepup_provider = Some(provider);
        self
    }

    /// Override the step-up polling bounds.
    pub fn with_step_up_config(mut self, config: StepUpConfig) -> Self {
        self.stepup_config = config;
        self
    }

    /// Override how long parked operations stay approvable.
    pub fn with_pending_ttl(mut self, ttl: Duration) -> Self {
        self.pending_ttl = ttl;
        self
    }

    /// Build the gateway.
    pub fn build(self) -> Result<ToolGateway, Error> {
        let store = self
            .store
            .ok_or_else(|| Error::Config("a relationship store is required".to_string()))?;
        let directory = self
            .directory
            .ok_or_else(|| Error::Config("a directory API is required".to_string()))?;
        let stepup_provider = self
            .stepup_provider
            .ok_or_else(|| Error::Config("a step-up provider is required".to_string()))?;

        let activity = Arc::new(ActivityLog::new());

        Ok(ToolGateway {
            evaluator: PermissionEvaluator::new(store.clone(), activity.clone()),
            mutator: RelationshipMutator::new(store, activity.clone()),
            directory,
            stepup: StepUpFlow::with_config(stepup_provider, self.stepup_config),
            activity,
            pending: Mutex::new(HashMap::new()),
            pending_ttl: self.pending_ttl,
            hooks: RwLock::new(Vec::new()),
            next_hook_id: AtomicU64::new(0),
        })
    }
}
