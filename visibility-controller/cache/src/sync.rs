use crate::{
    index::{self, Reader, Snapshot, Writer},
    metrics::SyncMetrics,
    skip::SkipSynchronizer,
};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use futures::prelude::*;
use std::sync::Arc;
use tokio::{sync::Mutex, time};
use tracing::{debug, info, trace, warn};
use visibility_controller_core::{
    ObservedResource, PolicyChanges, ResourceSource, ReviewError, Reviewer, StateVersion, Subject,
    VersionToken,
};

pub type SharedCache = Arc<Cache>;

/// Bounds the work done by a single synchronization pass.
#[derive(Clone, Debug)]
pub struct Config {
    /// Limits how long a single review may take. A review that times out is treated like any
    /// other failed review.
    pub review_timeout: time::Duration,

    /// The maximum number of reviews in flight during a pass.
    pub review_concurrency: usize,
}

/// Describes how a call to [`Cache::synchronize`] concluded.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The pass ran to completion.
    Completed {
        reviewed: usize,
        failed: usize,
        removed: usize,
    },

    /// The skip strategy determined that nothing changed.
    Skipped,

    /// Another pass was already in flight.
    Coalesced,

    /// The resource source could not be listed; the published snapshot was left untouched.
    SourceUnavailable,
}

/// Maintains the visibility indexes. Owned by whatever drives synchronization; queries go through
/// a [`Reader`].
pub struct Cache {
    reviewer: Box<dyn Reviewer>,
    source: Box<dyn ResourceSource>,
    policy: Box<dyn PolicyChanges>,
    config: Config,
    metrics: SyncMetrics,
    writer: Writer,

    /// Held for the duration of a pass so that passes never interleave.
    state: Mutex<State>,
}

struct State {
    skip: Box<dyn SkipSynchronizer>,
    records: HashMap<String, Record>,
    generation: u64,
}

/// The result of the last successful review of a resource.
struct Record {
    version: VersionToken,
    cluster_policy: String,
    subjects: Arc<[Subject]>,
}

// === impl Config ===

impl Default for Config {
    fn default() -> Self {
        Self {
            review_timeout: time::Duration::from_secs(5),
            review_concurrency: 16,
        }
    }
}

// === impl Outcome ===

impl Outcome {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Skipped => "skipped",
            Self::Coalesced => "coalesced",
            Self::SourceUnavailable => "source_unavailable",
        }
    }
}

// === impl Cache ===

impl Cache {
    pub fn new(
        reviewer: impl Reviewer + 'static,
        source: impl ResourceSource + 'static,
        policy: impl PolicyChanges + 'static,
        skip: impl SkipSynchronizer,
        config: Config,
        metrics: SyncMetrics,
    ) -> (Reader, SharedCache) {
        let (writer, reader) = index::pair();
        let cache = Self {
            reviewer: Box::new(reviewer),
            source: Box::new(source),
            policy: Box::new(policy),
            config,
            metrics,
            writer,
            state: Mutex::new(State {
                skip: Box::new(skip),
                records: HashMap::default(),
                generation: 0,
            }),
        };
        (reader, Arc::new(cache))
    }

    /// Drives synchronization on a fixed period until the task is dropped.
    pub async fn run(cache: SharedCache, period: time::Duration) {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            cache.synchronize().await;
        }
    }

    /// Runs a single synchronization pass.
    ///
    /// Re-reviews every resource that is new, whose version token changed, or that was reviewed
    /// under a different cluster policy checkpoint; drops resources that are no longer listed;
    /// and publishes a new snapshot if anything changed. A call made while another pass is in
    /// flight returns immediately.
    pub async fn synchronize(&self) -> Outcome {
        let outcome = match self.state.try_lock() {
            Ok(mut state) => self.sync(&mut state).await,
            Err(_) => {
                debug!("Synchronization already in progress");
                Outcome::Coalesced
            }
        };
        self.metrics.outcome(outcome.as_str());
        outcome
    }

    async fn sync(&self, state: &mut State) -> Outcome {
        let current = StateVersion {
            resources: self.source.state_version(),
            cluster_policy: self.policy.cluster_policy_version(),
        };
        if state.skip.skip(&current) {
            trace!(?current, "Unchanged; skipping synchronization");
            return Outcome::Skipped;
        }

        let resources = match self.source.list() {
            Ok(resources) => resources,
            Err(error) => {
                warn!(%error, "Failed to list resources; retaining the published snapshot");
                state.skip.reset();
                return Outcome::SourceUnavailable;
            }
        };

        let cluster_policy = current.cluster_policy;
        let pending = resources
            .iter()
            .filter(|resource| match state.records.get(&resource.name) {
                Some(record) => {
                    record.version != resource.version || record.cluster_policy != cluster_policy
                }
                None => true,
            })
            .cloned()
            .collect::<Vec<_>>();

        let reviews = stream::iter(pending)
            .map(|resource| self.review(resource))
            .buffer_unordered(self.config.review_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        let reviewed = reviews.len();
        let mut failed = 0;
        for (resource, result) in reviews {
            match result {
                Ok(subjects) => {
                    self.metrics.review(Ok(()));
                    trace!(resource = %resource.name, version = %resource.version, ?subjects, "Reviewed");
                    state.records.insert(
                        resource.name,
                        Record {
                            version: resource.version,
                            cluster_policy: cluster_policy.clone(),
                            subjects: subjects.into(),
                        },
                    );
                }
                Err(error) => {
                    self.metrics.review(Err(&error));
                    warn!(resource = %resource.name, %error, "Failed to review resource; retaining cached subjects");
                    failed += 1;
                }
            }
        }

        // A pass with failures never becomes the skip baseline; failed resources are retried on
        // the next tick.
        if failed > 0 {
            state.skip.reset();
        }

        let live = resources
            .iter()
            .map(|resource| resource.name.as_str())
            .collect::<HashSet<_>>();
        let before = state.records.len();
        state
            .records
            .retain(|name, _| live.contains(name.as_str()));
        let removed = before - state.records.len();

        // Publish even an empty first pass so readers can tell that the cache has synced.
        if reviewed > failed || removed > 0 || state.generation == 0 {
            state.generation += 1;
            let snapshot = Snapshot::build(
                state.generation,
                state
                    .records
                    .iter()
                    .map(|(name, record)| (name, &record.subjects)),
            );
            self.metrics.published(&snapshot);
            self.writer.publish(snapshot);
            info!(
                generation = state.generation,
                resources = state.records.len(),
                reviewed,
                failed,
                removed,
                "Published snapshot"
            );
        } else {
            debug!(reviewed, failed, "No changes to publish");
        }

        Outcome::Completed {
            reviewed,
            failed,
            removed,
        }
    }

    async fn review(
        &self,
        resource: ObservedResource,
    ) -> (ObservedResource, Result<Vec<Subject>, ReviewError>) {
        let timeout = self.config.review_timeout;
        let result = match time::timeout(timeout, self.reviewer.review(&resource.name)).await {
            Ok(result) => result,
            Err(_) => Err(ReviewError::Timeout(timeout)),
        };
        (resource, result)
    }
}
