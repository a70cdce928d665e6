//! Kubernetes resource source for the visibility cache
//!
//! Watches the objects that determine who can see a namespace and condenses them into the two
//! signals the cache consumes:
//!
//! - Each `Namespace` is a resource. Its version token combines the namespace's own resource
//!   version with the resource versions of every `Role` and `RoleBinding` in that namespace, so a
//!   change to namespaced policy re-reviews only that namespace.
//! - `ClusterRole`s and `ClusterRoleBinding`s may grant access to any namespace. Their resource
//!   versions are folded into a single cluster policy checkpoint; any change to it re-reviews
//!   every namespace.
//!
//! The index is updated by kubert watch tasks and read through a cloneable [`Source`] handle.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod index;
pub mod metrics;

#[cfg(test)]
mod tests;

pub use self::index::{Index, SharedIndex, Source};
