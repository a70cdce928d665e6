use crate::Snapshot;
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, gauge::Gauge},
    registry::Registry,
};
use visibility_controller_core::ReviewError;

/// Counts synchronization passes and reviews, and describes the published snapshot.
#[derive(Clone, Debug, Default)]
pub struct SyncMetrics {
    synchronizations: Family<OutcomeLabels, Counter>,
    reviews: Family<ReviewLabels, Counter>,

    generation: Gauge,
    resources: Gauge,
    users: Gauge,
    groups: Gauge,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct OutcomeLabels {
    outcome: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct ReviewLabels {
    result: &'static str,
}

// === impl SyncMetrics ===

impl SyncMetrics {
    pub fn register(prom: &mut Registry) -> Self {
        let synchronizations = Family::default();
        prom.register(
            "synchronizations",
            "Count of synchronization passes by outcome",
            synchronizations.clone(),
        );

        let reviews = Family::default();
        prom.register(
            "reviews",
            "Count of resource reviews by result",
            reviews.clone(),
        );

        let generation = Gauge::default();
        prom.register(
            "generation",
            "The generation of the published snapshot",
            generation.clone(),
        );

        let resources = Gauge::default();
        prom.register(
            "resources",
            "The number of resources in the published snapshot",
            resources.clone(),
        );

        let users = Gauge::default();
        prom.register(
            "users",
            "The number of users with direct grants in the published snapshot",
            users.clone(),
        );

        let groups = Gauge::default();
        prom.register(
            "groups",
            "The number of groups with grants in the published snapshot",
            groups.clone(),
        );

        Self {
            synchronizations,
            reviews,
            generation,
            resources,
            users,
            groups,
        }
    }

    pub(crate) fn outcome(&self, outcome: &'static str) {
        self.synchronizations
            .get_or_create(&OutcomeLabels { outcome })
            .inc();
    }

    pub(crate) fn review(&self, result: Result<(), &ReviewError>) {
        let result = match result {
            Ok(()) => "ok",
            Err(ReviewError::Unknown(_)) => "unknown",
            Err(ReviewError::Failed(_)) => "failed",
            Err(ReviewError::Timeout(_)) => "timeout",
        };
        self.reviews.get_or_create(&ReviewLabels { result }).inc();
    }

    pub(crate) fn published(&self, snapshot: &Snapshot) {
        self.generation.set(snapshot.generation() as i64);
        self.resources.set(snapshot.num_resources() as i64);
        self.users.set(snapshot.num_users() as i64);
        self.groups.set(snapshot.num_groups() as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus_client::encoding::text::encode;

    #[test]
    fn encodes_registered_metrics() {
        let mut prom = Registry::default();
        let metrics = SyncMetrics::register(prom.sub_registry_with_prefix("visibility_cache"));
        metrics.outcome("completed");
        metrics.review(Ok(()));
        metrics.review(Err(&ReviewError::Unknown("foo".to_string())));

        let mut out = String::new();
        encode(&mut out, &prom).unwrap();
        assert!(out.contains("visibility_cache_synchronizations_total{outcome=\"completed\"} 1"));
        assert!(out.contains("visibility_cache_reviews_total{result=\"ok\"} 1"));
        assert!(out.contains("visibility_cache_reviews_total{result=\"unknown\"} 1"));
        assert!(out.contains("visibility_cache_generation 0"));
    }
}
