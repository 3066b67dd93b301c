//! Permission checks for gated catalog entries.

use std::collections::HashSet;

use dashmap::DashMap;
use market_core::{CatalogEntry, VisitorId};

/// Answers whether a visitor holds a permission node.
pub trait Authorizer: Send + Sync {
    fn has_node(&self, visitor: VisitorId, node: &str) -> bool;
}

/// True when `visitor` may see and buy `entry`.
///
/// Entries without a requirement are open to everyone; otherwise the node
/// check is XOR-ed with the requirement's `invert` flag.
pub fn permits(authorizer: &dyn Authorizer, visitor: VisitorId, entry: &CatalogEntry) -> bool {
    entry.permission.as_ref().is_none_or(|requirement| {
        requirement.evaluate(authorizer.has_node(visitor, &requirement.node))
    })
}

/// Explicit per-visitor grants held in memory.
///
/// Visitors without grants hold no nodes.
#[derive(Debug, Default)]
pub struct StaticPermissions {
    grants: DashMap<VisitorId, HashSet<String>>,
}

impl StaticPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, visitor: VisitorId, node: impl Into<String>) {
        self.grants.entry(visitor).or_default().insert(node.into());
    }

    pub fn revoke(&self, visitor: VisitorId, node: &str) -> bool {
        self.grants
            .get_mut(&visitor)
            .is_some_and(|mut nodes| nodes.remove(node))
    }
}

impl Authorizer for StaticPermissions {
    fn has_node(&self, visitor: VisitorId, node: &str) -> bool {
        self.grants
            .get(&visitor)
            .is_some_and(|nodes| nodes.contains(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::PermissionRequirement;

    fn gated(node: &str, invert: bool) -> CatalogEntry {
        CatalogEntry {
            permission: Some(PermissionRequirement {
                node: node.to_string(),
                invert,
            }),
            ..CatalogEntry::new("gated", 1.0)
        }
    }

    #[test]
    fn ungated_entries_are_open() {
        let permissions = StaticPermissions::new();
        assert!(permits(
            &permissions,
            VisitorId::random(),
            &CatalogEntry::new("open", 1.0)
        ));
    }

    #[test]
    fn requirement_is_xored_with_invert() {
        let permissions = StaticPermissions::new();
        let veteran = VisitorId::random();
        let newcomer = VisitorId::random();
        permissions.grant(veteran, "market.veteran");

        let veterans_only = gated("market.veteran", false);
        assert!(permits(&permissions, veteran, &veterans_only));
        assert!(!permits(&permissions, newcomer, &veterans_only));

        let newcomers_only = gated("market.veteran", true);
        assert!(!permits(&permissions, veteran, &newcomers_only));
        assert!(permits(&permissions, newcomer, &newcomers_only));
    }

    #[test]
    fn revoke_removes_a_single_node() {
        let permissions = StaticPermissions::new();
        let visitor = VisitorId::random();
        permissions.grant(visitor, "a");
        permissions.grant(visitor, "b");

        assert!(permissions.revoke(visitor, "a"));
        assert!(!permissions.revoke(visitor, "a"));
        assert!(!permissions.has_node(visitor, "a"));
        assert!(permissions.has_node(visitor, "b"));
    }
}
