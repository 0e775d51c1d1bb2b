//! `stockforge-auth` — authorization boundary for the stock ledger.
//!
//! This crate is intentionally decoupled from HTTP, tokens, and storage.

pub mod gate;
pub mod permissions;

pub use gate::{Actor, AllowAllGate, PermissionGate, Role, RoleTableGate};
pub use permissions::Permission;
