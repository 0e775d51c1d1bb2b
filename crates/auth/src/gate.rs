//! Authorization contract consumed by the transaction coordinator.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use stockforge_core::UserId;

use crate::permissions::Permission;

/// Role identifier used for RBAC.
///
/// Roles are opaque strings at this layer; mapping roles to permissions is
/// the gate implementation's concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The acting identity attached to every mutating call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub roles: Vec<Role>,
}

impl Actor {
    pub fn new(user_id: UserId, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            user_id,
            roles: roles.into_iter().collect(),
        }
    }
}

/// Authorization decision point.
///
/// Checked before every mutating ledger operation; a denial short-circuits
/// the call with zero side effects. Implementations must be pure policy
/// checks (no IO on the hot path).
pub trait PermissionGate: Send + Sync {
    fn check(&self, actor: &Actor, permission: &Permission) -> bool;
}

impl<G> PermissionGate for Arc<G>
where
    G: PermissionGate + ?Sized,
{
    fn check(&self, actor: &Actor, permission: &Permission) -> bool {
        (**self).check(actor, permission)
    }
}

/// Static role → permission table.
///
/// A role granting the wildcard permission `"*"` passes every check.
#[derive(Debug, Clone, Default)]
pub struct RoleTableGate {
    table: HashMap<String, Vec<Permission>>,
}

impl RoleTableGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(
        mut self,
        role: impl Into<String>,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Self {
        self.table
            .entry(role.into())
            .or_default()
            .extend(permissions);
        self
    }

    /// Default warehouse policy: admins hold the wildcard, managers hold the
    /// full inventory set, warehouse staff can move stock but not adjust it.
    pub fn warehouse_defaults() -> Self {
        use crate::permissions::*;

        Self::new()
            .with_role("admin", [Permission::from_static("*")])
            .with_role(
                "manager",
                [
                    INVENTORY_RECEIVE,
                    INVENTORY_ISSUE,
                    INVENTORY_ADJUST,
                    INVENTORY_RESERVE,
                    INVENTORY_TRANSFER,
                    INVENTORY_MANAGE,
                ],
            )
            .with_role(
                "warehouse",
                [
                    INVENTORY_RECEIVE,
                    INVENTORY_ISSUE,
                    INVENTORY_RESERVE,
                    INVENTORY_TRANSFER,
                ],
            )
    }
}

impl PermissionGate for RoleTableGate {
    fn check(&self, actor: &Actor, permission: &Permission) -> bool {
        let granted: HashSet<&str> = actor
            .roles
            .iter()
            .filter_map(|role| self.table.get(role.as_str()))
            .flatten()
            .map(|p| p.as_str())
            .collect();

        granted.contains("*") || granted.contains(permission.as_str())
    }
}

/// Gate that allows everything. Tests and trusted internal callers only.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllGate;

impl PermissionGate for AllowAllGate {
    fn check(&self, _actor: &Actor, _permission: &Permission) -> bool {
        true
    }
}
