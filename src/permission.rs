//! Form permission gate
//!
//! Decides whether a caller may open the proposal form and explains a denial
//! using the names of the roles that would have been accepted.

use crate::error::AppResult;
use crate::interaction::Caller;
use crate::repository::FormPermissionSettings;
use async_trait::async_trait;
use tracing::debug;

/// A guild role as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleInfo {
    pub id: String,
    pub name: String,
}

/// Role name lookup provided by the platform client
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn fetch_role(&self, guild_id: &str, role_id: &str) -> AppResult<Option<RoleInfo>>;
}

/// A caller is permitted when no policy is configured, the policy lists no
/// roles, or the caller holds at least one listed role.
pub fn is_permitted(caller: &Caller, policy: Option<&FormPermissionSettings>) -> bool {
    match policy {
        None => true,
        Some(policy) if policy.allowed_roles.is_empty() => true,
        Some(policy) => policy.allowed_roles.iter().any(|role| caller.has_role(role)),
    }
}

/// Resolve role ids to names, skipping any role that cannot be resolved
pub async fn resolve_role_names(
    directory: &dyn RoleDirectory,
    guild_id: &str,
    role_ids: &[String],
) -> Vec<String> {
    let mut names = Vec::with_capacity(role_ids.len());
    for role_id in role_ids {
        match directory.fetch_role(guild_id, role_id).await {
            Ok(Some(role)) => names.push(role.name),
            Ok(None) => debug!("Role {} not found in guild {}", role_id, guild_id),
            Err(e) => debug!("Role lookup for {} in guild {} failed: {}", role_id, guild_id, e),
        }
    }
    names
}

/// Ephemeral explanation shown when the form is refused
pub fn denied_message(role_names: &[String]) -> String {
    if role_names.is_empty() {
        "You do not have permission to use this form.".to_string()
    } else {
        format!(
            "You do not have permission to use this form. Required roles (any of): {}",
            role_names.join(", ")
        )
    }
}
