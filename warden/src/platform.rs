//! Collaborator traits implemented by the chat-platform adapter.
//!
//! The core never talks to a concrete chat platform. Everything it needs
//! from one — existence checks for mentioned entities, sending messages,
//! permission decisions — comes in through the traits below.

use crate::error::Result;
use crate::message::CommandMessage;
use async_trait::async_trait;
use std::collections::BTreeSet;

/// What kind of platform entity an id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntityKind {
    /// A member of the organization.
    User,
    /// A role within the organization.
    Role,
    /// A text channel.
    Channel,
}

/// Permission level a command requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Permission {
    /// Anyone may run the command.
    #[default]
    Everyone,
    /// Moderators and above.
    Moderator,
    /// Organization administrators only.
    Admin,
}

/// Resolves whether referenced platform entities actually exist.
///
/// Consumed only by the validation predicates for entity-list and
/// channel-list arguments.
#[async_trait]
pub trait EntityResolver: Send + Sync {
    /// `true` when every id in `ids` names an existing entity of the
    /// given kind within `org_id`.
    async fn resolve_entities(&self, org_id: u64, ids: &BTreeSet<u64>, kind: EntityKind) -> bool;
}

/// Sends messages back to the platform.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Post `text` to the channel.
    async fn send(&self, org_id: u64, channel_id: u64, text: &str) -> Result<()>;
}

/// Decides whether a sender may run a command.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// `true` when the sender of `msg` holds at least `required`.
    async fn allows(&self, msg: &CommandMessage, required: Permission) -> bool;
}

/// A resolver that considers every entity to exist. Useful for tests and
/// local tooling without a platform connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllResolver;

#[async_trait]
impl EntityResolver for AllowAllResolver {
    async fn resolve_entities(&self, _org: u64, _ids: &BTreeSet<u64>, _kind: EntityKind) -> bool {
        true
    }
}

/// A gate that lets everything through.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGate;

#[async_trait]
impl PermissionGate for OpenGate {
    async fn allows(&self, _msg: &CommandMessage, _required: Permission) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_ordering() {
        assert!(Permission::Admin > Permission::Moderator);
        assert!(Permission::Moderator > Permission::Everyone);
    }

    #[tokio::test]
    async fn test_allow_all_resolver() {
        let resolver = AllowAllResolver;
        let ids: BTreeSet<u64> = [1, 2].into_iter().collect();
        assert!(resolver.resolve_entities(0, &ids, EntityKind::User).await);
    }
}
