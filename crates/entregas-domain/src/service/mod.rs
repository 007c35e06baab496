//! Domain services
//!
//! Every operation takes a store transaction (`&mut impl Records`); callers
//! run one operation per `EntityStore::transaction` so the read-validate-write
//! sequence is atomic.

pub mod access_scope;
pub mod capacity_ledger;
pub mod eligibility;

pub use access_scope::{AccessPolicy, AccessScope, Caller, Principal, Role, Scope, Scoped};
pub use capacity_ledger::{Detached, Drift, Reconciled, RouteLoad};
