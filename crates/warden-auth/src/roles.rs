//! Effective role resolution
//!
//! A user's effective roles are the roles assigned to it directly plus every
//! role granted to one of its groups.

use crate::identity::Identity;
use crate::traits::GroupRoleRepository;
use crate::AuthResult;
use std::collections::HashSet;

/// Merges direct and group-inherited roles
#[derive(Debug, Clone)]
pub struct RoleResolver<G> {
    groups: G,
}

impl<G> RoleResolver<G>
where
    G: GroupRoleRepository,
{
    pub fn new(groups: G) -> Self {
        Self { groups }
    }

    /// Get the underlying group repository
    pub fn group_repository(&self) -> &G {
        &self.groups
    }

    /// Union of the identity's roles and the roles of each of its groups
    pub async fn resolve_roles(&self, identity: &Identity) -> AuthResult<HashSet<String>> {
        let mut roles = identity.roles.clone();

        for group in &identity.groups {
            let group_roles = self.groups.find_roles_for_group(group).await?;
            roles.extend(group_roles);
        }

        Ok(roles)
    }

    /// Check if the identity holds a role, directly or through a group
    pub async fn has_role(&self, identity: &Identity, role: &str) -> AuthResult<bool> {
        if identity.has_direct_role(role) {
            return Ok(true);
        }
        Ok(self.resolve_roles(identity).await?.contains(role))
    }

    /// Resolved roles in a stable order
    pub async fn sorted_roles(&self, identity: &Identity) -> AuthResult<Vec<String>> {
        let mut roles: Vec<String> = self.resolve_roles(identity).await?.into_iter().collect();
        roles.sort();
        Ok(roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryGroupRoleRepository;

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn resolver() -> RoleResolver<InMemoryGroupRoleRepository> {
        let groups = InMemoryGroupRoleRepository::new();
        groups.grant("g1", ["REVIEWER", "EDITOR"]);
        groups.grant("g2", ["PUBLISHER"]);
        RoleResolver::new(groups)
    }

    #[tokio::test]
    async fn test_direct_and_group_roles_merge() {
        let alice = Identity::new("alice").with_roles(["EDITOR"]).with_groups(["g1"]);

        let roles = resolver().resolve_roles(&alice).await.unwrap();
        assert_eq!(roles, set(&["EDITOR", "REVIEWER"]));
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent_and_order_independent() {
        let resolver = resolver();
        let first = Identity::new("bob").with_groups(["g1", "g2"]);
        let second = Identity::new("bob").with_groups(["g2", "g1"]);

        let once = resolver.resolve_roles(&first).await.unwrap();
        let twice = resolver.resolve_roles(&first).await.unwrap();
        let reordered = resolver.resolve_roles(&second).await.unwrap();

        assert_eq!(once, twice);
        assert_eq!(once, reordered);
        assert_eq!(once, set(&["EDITOR", "REVIEWER", "PUBLISHER"]));
    }

    #[tokio::test]
    async fn test_empty_identity_resolves_to_empty_set() {
        let roles = resolver()
            .resolve_roles(&Identity::new("nobody"))
            .await
            .unwrap();
        assert!(roles.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_group_contributes_nothing() {
        let identity = Identity::new("carol").with_roles(["VIEWER"]).with_groups(["ghost"]);

        let roles = resolver().resolve_roles(&identity).await.unwrap();
        assert_eq!(roles, set(&["VIEWER"]));
    }

    #[tokio::test]
    async fn test_has_role_and_sorted_roles() {
        let resolver = resolver();
        let alice = Identity::new("alice").with_roles(["EDITOR"]).with_groups(["g2"]);

        assert!(resolver.has_role(&alice, "EDITOR").await.unwrap());
        assert!(resolver.has_role(&alice, "PUBLISHER").await.unwrap());
        assert!(!resolver.has_role(&alice, "REVIEWER").await.unwrap());

        assert_eq!(
            resolver.sorted_roles(&alice).await.unwrap(),
            vec!["EDITOR".to_string(), "PUBLISHER".to_string()]
        );
    }
}
