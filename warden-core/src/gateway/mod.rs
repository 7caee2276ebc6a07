//! Agent tool gateway: the dispatch layer between the LLM tool-calling
//! runtime and the external identity systems.
//!
//! Every tool call goes through identifier resolution, a permission check,
//! and - for the sensitive subset - step-up parking before anything touches
//! the directory or the relationship store. See [`ToolGateway`].

mod directory;
mod dispatch;
mod types;

pub use directory::{DirectoryApi, DirectoryError, DirectoryUser};
pub use dispatch::{GatewayBuilder, ToolGateway, DEFAULT_PENDING_TTL};
pub use types::{
    AddMemberInput, DeleteUserInput, GetMemberInput, InviteMemberInput, ListMembersInput,
    OperationContext, RemoveMemberInput, ResetMfaInput, ToolCall, ToolOutcome, ToolSpec,
    UpdateMemberRolesInput,
};
