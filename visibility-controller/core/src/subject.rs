use std::fmt;

/// Distinguishes users from groups in a reviewer's results.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubjectKind {
    User,
    Group,
}

/// A user or group that may be granted access to a resource.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Subject {
    pub kind: SubjectKind,
    pub name: String,
}

/// The identity of a caller, as presented by an authenticator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserInfo {
    pub name: String,
    pub groups: Vec<String>,
}

// === impl Subject ===

impl Subject {
    pub fn user(name: impl ToString) -> Self {
        Self {
            kind: SubjectKind::User,
            name: name.to_string(),
        }
    }

    pub fn group(name: impl ToString) -> Self {
        Self {
            kind: SubjectKind::Group,
            name: name.to_string(),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SubjectKind::User => write!(f, "user:{}", self.name),
            SubjectKind::Group => write!(f, "group:{}", self.name),
        }
    }
}

// === impl UserInfo ===

impl UserInfo {
    pub fn new(
        name: impl ToString,
        groups: impl IntoIterator<Item = impl ToString>,
    ) -> Self {
        Self {
            name: name.to_string(),
            groups: groups.into_iter().map(|g| g.to_string()).collect(),
        }
    }
}
