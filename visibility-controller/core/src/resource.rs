use crate::SourceError;
use std::fmt;

/// An opaque marker that changes whenever a resource's access rules may have changed.
///
/// Tokens are only ever compared for equality.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct VersionToken(String);

/// A resource as currently known to a [`ResourceSource`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservedResource {
    pub name: String,
    pub version: VersionToken,
}

/// A fingerprint of everything the cache depends on.
///
/// Skip strategies compare fingerprints between passes to decide whether a pass can be avoided.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct StateVersion {
    pub resources: String,
    pub cluster_policy: String,
}

/// Provides the current set of protected resources. The cache only ever reads from a source.
pub trait ResourceSource: Send + Sync {
    /// Lists every known resource with its current version token.
    fn list(&self) -> Result<Vec<ObservedResource>, SourceError>;

    /// Returns a value that changes whenever any listed resource (or its version) changes.
    fn state_version(&self) -> String;
}

/// Signals changes to cluster-scoped authorization objects.
///
/// Any change to the returned checkpoint invalidates every cached review.
pub trait PolicyChanges: Send + Sync {
    fn cluster_policy_version(&self) -> String;
}

// === impl VersionToken ===

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for VersionToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for VersionToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// === impl ObservedResource ===

impl ObservedResource {
    pub fn new(name: impl ToString, version: impl Into<VersionToken>) -> Self {
        Self {
            name: name.to_string(),
            version: version.into(),
        }
    }
}
