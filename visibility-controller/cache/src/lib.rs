//! Namespace visibility cache
//!
//! Answers "which resources can this user see?" without invoking a policy reviewer on the query
//! path. The cache is fed by three collaborators:
//!
//! - A [`ResourceSource`] lists the protected resources, each with a version token that changes
//!   whenever the resource's own access rules may have changed.
//! - A [`PolicyChanges`] checkpoint changes whenever a cluster-scoped authorization object
//!   changes. Any change invalidates every cached review.
//! - A [`Reviewer`] resolves the users and groups with access to a single resource.
//!
//! ```text
//! [ ResourceSource ] + [ PolicyChanges ] -> [ Cache::synchronize ] -> [ Snapshot ] -> [ Reader ]
//!                                                   |
//!                                              [ Reviewer ]
//! ```
//!
//! Each synchronization pass re-reviews only the resources whose version token or cluster policy
//! checkpoint differs from the one they were last reviewed at, then publishes a new immutable
//! [`Snapshot`] holding both the resource->subjects index and the subject->resources index.
//! Readers always observe a whole snapshot; a pass that is still in flight is never visible.
//!
//! Passes are gated by a [`SkipSynchronizer`] so that a periodic driver does not rescan an
//! unchanged world.
//!
//! [`ResourceSource`]: visibility_controller_core::ResourceSource
//! [`PolicyChanges`]: visibility_controller_core::PolicyChanges
//! [`Reviewer`]: visibility_controller_core::Reviewer

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod index;
mod metrics;
mod skip;
mod sync;


pub use self::{
    index::{Reader, Snapshot},
    metrics::SyncMetrics,
    skip::{NeverSkip, SkipSynchronizer, StatelessSkip},
    sync::{Cache, Config, Outcome, SharedCache},
};
