use crate::{
    cache::{Cache, Config, NeverSkip, SkipSynchronizer, StatelessSkip, SyncMetrics},
    index, k8s, AccessReviewer,
};
use anyhow::{bail, Result};
use clap::Parser;
use kube::runtime::watcher;
use prometheus_client::registry::Registry;
use tokio::time::Duration;
use tracing::{info, info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(name = "visibility", about = "A namespace visibility controller")]
pub struct Args {
    #[clap(
        long,
        default_value = "visibility=info,warn",
        env = "VISIBILITY_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// How often a synchronization pass is attempted.
    #[clap(long, default_value = "1000")]
    sync_interval_ms: u64,

    /// Limits how long a single namespace review may take.
    #[clap(long, default_value = "5000")]
    review_timeout_ms: u64,

    /// The maximum number of namespace reviews in flight.
    #[clap(long, default_value = "16")]
    review_concurrency: usize,

    /// Runs a synchronization pass on every tick, even when no watched object has changed.
    #[clap(long)]
    always_sync: bool,

    /// The verb whose access grants visibility of a namespace.
    #[clap(long, default_value = "get")]
    review_verb: String,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            admin,
            client,
            log_level,
            log_format,
            sync_interval_ms,
            review_timeout_ms,
            review_concurrency,
            always_sync,
            review_verb,
        } = self;

        // Build the index of watched objects, which serves as both the resource source and the
        // cluster policy checkpoint for the cache.
        let watched = index::Index::shared();

        let mut prom = <Registry>::default();
        let sync_metrics = SyncMetrics::register(prom.sub_registry_with_prefix("visibility_cache"));
        index::metrics::register(
            prom.sub_registry_with_prefix("visibility_index"),
            watched.clone(),
        );
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let mut runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .build()
            .await?;

        let skip: Box<dyn SkipSynchronizer> = if always_sync {
            Box::new(NeverSkip)
        } else {
            Box::new(StatelessSkip::default())
        };
        let source = index::Index::source(&watched);
        let (reader, cache) = Cache::new(
            AccessReviewer::new(runtime.client(), review_verb),
            source.clone(),
            source,
            skip,
            Config {
                review_timeout: Duration::from_millis(review_timeout_ms),
                review_concurrency,
            },
            sync_metrics,
        );

        // Spawn resource watches.

        let namespaces = runtime.watch_all::<k8s::Namespace>(watcher::Config::default());
        tokio::spawn(
            kubert::index::cluster(watched.clone(), namespaces)
                .instrument(info_span!("namespaces")),
        );

        let roles = runtime.watch_all::<k8s::Role>(watcher::Config::default());
        tokio::spawn(
            kubert::index::namespaced(watched.clone(), roles).instrument(info_span!("roles")),
        );

        let role_bindings = runtime.watch_all::<k8s::RoleBinding>(watcher::Config::default());
        tokio::spawn(
            kubert::index::namespaced(watched.clone(), role_bindings)
                .instrument(info_span!("rolebindings")),
        );

        let cluster_roles = runtime.watch_all::<k8s::ClusterRole>(watcher::Config::default());
        tokio::spawn(
            kubert::index::cluster(watched.clone(), cluster_roles)
                .instrument(info_span!("clusterroles")),
        );

        let cluster_role_bindings =
            runtime.watch_all::<k8s::ClusterRoleBinding>(watcher::Config::default());
        tokio::spawn(
            kubert::index::cluster(watched, cluster_role_bindings)
                .instrument(info_span!("clusterrolebindings")),
        );

        // Spawn the synchronization loop.
        tokio::spawn(
            Cache::run(cache, Duration::from_millis(sync_interval_ms))
                .instrument(info_span!("sync")),
        );

        tokio::spawn(
            async move {
                reader.synced().await;
                let snapshot = reader.snapshot();
                info!(
                    generation = snapshot.generation(),
                    namespaces = snapshot.num_resources(),
                    "Visibility cache synchronized"
                );
            }
            .instrument(info_span!("readiness")),
        );

        // Block the main thread on the shutdown signal. Once it fires, wait for the background tasks to
        // complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}
