use ahash::AHashMap as HashMap;
use parking_lot::RwLock;
use std::{collections::BTreeSet, sync::Arc};
use tokio::{sync::watch, time};
use visibility_controller_core::{ListError, Subject, SubjectKind, UserInfo};

/// An immutable view of the cache as of a completed synchronization pass.
#[derive(Debug, Default)]
pub struct Snapshot {
    generation: u64,

    /// Resource -> subjects, as last returned by the reviewer.
    resources: HashMap<String, Arc<[Subject]>>,

    /// User name -> resources naming that user directly.
    users: HashMap<String, BTreeSet<String>>,

    /// Group name -> resources naming that group.
    groups: HashMap<String, BTreeSet<String>>,
}

/// Supports queries against the most recently published snapshot.
#[derive(Clone, Debug)]
pub struct Reader {
    snapshot: Shared,
    generations: watch::Receiver<u64>,
}

/// Publishes snapshots. Only the synchronization engine holds a writer.
#[derive(Debug)]
pub(crate) struct Writer {
    snapshot: Shared,
    generations: watch::Sender<u64>,
}

type Shared = Arc<RwLock<Arc<Snapshot>>>;

pub(crate) fn pair() -> (Writer, Reader) {
    let snapshot = Shared::default();
    let (tx, rx) = watch::channel(0);
    let w = Writer {
        snapshot: snapshot.clone(),
        generations: tx,
    };
    let r = Reader {
        snapshot,
        generations: rx,
    };
    (w, r)
}

// === impl Snapshot ===

impl Snapshot {
    /// Builds the reverse index from a resource->subjects index.
    ///
    /// Groups are indexed exactly like users; membership is resolved when a user is queried.
    pub(crate) fn build<'a>(
        generation: u64,
        reviewed: impl IntoIterator<Item = (&'a String, &'a Arc<[Subject]>)>,
    ) -> Self {
        let mut snapshot = Self {
            generation,
            ..Default::default()
        };

        for (resource, subjects) in reviewed {
            for subject in subjects.iter() {
                let by_name = match subject.kind {
                    SubjectKind::User => &mut snapshot.users,
                    SubjectKind::Group => &mut snapshot.groups,
                };
                by_name
                    .entry(subject.name.clone())
                    .or_default()
                    .insert(resource.clone());
            }
            snapshot
                .resources
                .insert(resource.clone(), subjects.clone());
        }

        snapshot
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn subjects(&self, resource: &str) -> Option<&[Subject]> {
        self.resources.get(resource).map(|s| &**s)
    }

    pub fn num_resources(&self) -> usize {
        self.resources.len()
    }

    pub fn num_users(&self) -> usize {
        self.users.len()
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// Returns every resource visible to `user`, either directly or through one of its groups.
    pub fn visible_to(&self, user: &UserInfo) -> BTreeSet<String> {
        let direct = self.users.get(&user.name);
        let by_group = user.groups.iter().filter_map(|g| self.groups.get(g));
        direct
            .into_iter()
            .chain(by_group)
            .flat_map(|resources| resources.iter().cloned())
            .collect()
    }

    pub fn can_see(&self, user: &UserInfo, resource: &str) -> bool {
        let Some(subjects) = self.resources.get(resource) else {
            return false;
        };
        subjects.iter().any(|s| match s.kind {
            SubjectKind::User => s.name == user.name,
            SubjectKind::Group => user.groups.iter().any(|g| *g == s.name),
        })
    }
}

// === impl Writer ===

impl Writer {
    pub(crate) fn publish(&self, snapshot: Snapshot) {
        let generation = snapshot.generation;
        *self.snapshot.write() = Arc::new(snapshot);
        self.generations.send_replace(generation);
    }
}

// === impl Reader ===

impl Reader {
    /// Returns the current snapshot. The snapshot remains valid (though possibly stale) for as
    /// long as the caller holds it.
    #[inline]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().clone()
    }

    /// Lists the resources visible to `user`. A user without any grants sees an empty set.
    pub fn list(&self, user: &UserInfo) -> Result<BTreeSet<String>, ListError> {
        if user.name.is_empty() {
            return Err(ListError::MissingUser);
        }
        Ok(self.snapshot().visible_to(user))
    }

    pub fn can_see(&self, user: &UserInfo, resource: &str) -> bool {
        self.snapshot().can_see(user, resource)
    }

    /// Indicates whether at least one synchronization pass has been published.
    pub fn is_synced(&self) -> bool {
        *self.generations.borrow() > 0
    }

    pub fn generation(&self) -> u64 {
        *self.generations.borrow()
    }

    /// Waits until the first synchronization pass has been published.
    pub async fn synced(&self) {
        let mut generations = self.generations.clone();
        // The sender is only dropped with the cache, at which point nothing will be published.
        let _ = generations.wait_for(|generation| *generation > 0).await;
    }

    /// Waits until a published snapshot shows `resource` to `user`.
    ///
    /// Returns false if `timeout` elapses first. This never triggers a synchronization; it only
    /// observes the passes that some driver runs.
    pub async fn wait_until_visible(
        &self,
        user: &UserInfo,
        resource: &str,
        timeout: time::Duration,
    ) -> bool {
        let mut generations = self.generations.clone();
        let _ = generations.borrow_and_update();

        let wait = async {
            loop {
                if self.can_see(user, resource) {
                    return true;
                }
                if generations.changed().await.is_err() {
                    // The cache has been dropped, so nothing else will be published.
                    return self.can_see(user, resource);
                }
            }
        };

        time::timeout(timeout, wait).await.unwrap_or(false)
    }
}
