#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod error;
mod resource;
mod subject;

pub use self::{
    error::{ListError, ReviewError, SourceError},
    resource::{ObservedResource, PolicyChanges, ResourceSource, StateVersion, VersionToken},
    subject::{Subject, SubjectKind, UserInfo},
};

/// Resolves the subjects that have been granted access to a resource.
///
/// Implementations may block on network I/O. The cache bounds each call with a timeout and never
/// invokes a reviewer while answering a query.
#[async_trait::async_trait]
pub trait Reviewer: Send + Sync {
    /// Returns the subjects with access to `resource`.
    ///
    /// An empty list is a successful review in which nobody has been granted access; an unknown
    /// resource is reported as [`ReviewError::Unknown`].
    async fn review(&self, resource: &str) -> Result<Vec<Subject>, ReviewError>;
}
