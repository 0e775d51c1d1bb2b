use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "inventory.issue").
/// A special wildcard permission `"*"` can be used by policy layers to
/// indicate "allow all" without hardcoding domain permissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Permissions guarding the stock ledger's mutating operations.
pub const INVENTORY_RECEIVE: Permission = Permission::from_static("inventory.receive");
pub const INVENTORY_ISSUE: Permission = Permission::from_static("inventory.issue");
pub const INVENTORY_ADJUST: Permission = Permission::from_static("inventory.adjust");
pub const INVENTORY_RESERVE: Permission = Permission::from_static("inventory.reserve");
pub const INVENTORY_TRANSFER: Permission = Permission::from_static("inventory.transfer");
pub const INVENTORY_MANAGE: Permission = Permission::from_static("inventory.manage");
