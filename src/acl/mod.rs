//! Permission caching and access decisions.

mod admission;
mod cache;
mod resolver;
mod substitution;
mod sync;

#[cfg(test)]
mod testing;

pub use admission::{AdmissionGate, OpenGate, PolicyGate, admission_gate};
pub use cache::{PermissionCache, UpsertOutcome};
pub use resolver::{AccessResolver, Decision};
pub use substitution::ActorSubstitution;
pub use sync::{PermissionSynchronizer, SyncSummary};
