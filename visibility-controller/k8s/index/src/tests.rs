use crate::{Index, SharedIndex, Source};
use kubert::index::{IndexClusterResource, IndexNamespacedResource};
use visibility_controller_core::{ObservedResource, PolicyChanges, ResourceSource, VersionToken};
use visibility_controller_k8s_api::{
    ClusterRole, ClusterRoleBinding, Namespace, ObjectMeta, Role, RoleBinding,
};

struct TestConfig {
    index: SharedIndex,
    source: Source,
    _tracing: tracing::subscriber::DefaultGuard,
}

fn meta(ns: Option<&str>, name: &str, resource_version: &str) -> ObjectMeta {
    ObjectMeta {
        namespace: ns.map(ToString::to_string),
        name: Some(name.to_string()),
        resource_version: Some(resource_version.to_string()),
        ..Default::default()
    }
}

fn mk_namespace(name: &str, resource_version: &str) -> Namespace {
    Namespace {
        metadata: meta(None, name, resource_version),
        ..Default::default()
    }
}

fn mk_role(ns: &str, name: &str, resource_version: &str) -> Role {
    Role {
        metadata: meta(Some(ns), name, resource_version),
        ..Default::default()
    }
}

fn mk_role_binding(ns: &str, name: &str, resource_version: &str) -> RoleBinding {
    RoleBinding {
        metadata: meta(Some(ns), name, resource_version),
        ..Default::default()
    }
}

fn mk_cluster_role(name: &str, resource_version: &str) -> ClusterRole {
    ClusterRole {
        metadata: meta(None, name, resource_version),
        ..Default::default()
    }
}

fn mk_cluster_role_binding(name: &str, resource_version: &str) -> ClusterRoleBinding {
    ClusterRoleBinding {
        metadata: meta(None, name, resource_version),
        ..Default::default()
    }
}

#[test]
fn unavailable_until_namespaces_observed() {
    let test = TestConfig::default();
    test.source
        .list()
        .expect_err("namespaces have not been observed");

    test.apply_cluster(mk_namespace("default", "1"));
    assert_eq!(
        test.source.list().unwrap(),
        vec![ObservedResource::new("default", "1")]
    );
}

#[test]
fn lists_namespaces_in_order() {
    let test = TestConfig::default();
    test.apply_cluster(mk_namespace("foo", "1"));
    test.apply_cluster(mk_namespace("bar", "2"));
    test.apply_cluster(mk_namespace("car", "3"));

    let names = test
        .source
        .list()
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["bar", "car", "foo"]);

    IndexClusterResource::<Namespace>::delete(&mut *test.index.write(), "car".to_string());
    assert_eq!(test.source.list().unwrap().len(), 2);
}

#[test]
fn namespaced_policy_changes_only_that_namespace() {
    let test = TestConfig::default();
    test.apply_cluster(mk_namespace("foo", "1"));
    test.apply_cluster(mk_namespace("bar", "1"));
    let before = test.versions();
    let cluster = test.source.cluster_policy_version();

    test.apply_namespaced(mk_role_binding("foo", "admin", "7"));
    let after = test.versions();
    assert_ne!(before[1], after[1], "foo must change");
    assert_eq!(before[0], after[0], "bar must not change");
    assert_eq!(cluster, test.source.cluster_policy_version());

    test.apply_namespaced(mk_role("foo", "viewer", "8"));
    let with_role = test.versions();
    assert_ne!(after[1], with_role[1]);

    // Removing all namespaced policy restores the original token.
    IndexNamespacedResource::<Role>::delete(
        &mut *test.index.write(),
        "foo".to_string(),
        "viewer".to_string(),
    );
    IndexNamespacedResource::<RoleBinding>::delete(
        &mut *test.index.write(),
        "foo".to_string(),
        "admin".to_string(),
    );
    assert_eq!(before, test.versions());
}

#[test]
fn policy_may_precede_namespace() {
    let test = TestConfig::default();
    test.apply_namespaced(mk_role_binding("foo", "admin", "7"));
    test.apply_cluster(mk_namespace("foo", "1"));

    let versions = test.versions();
    assert_ne!(versions[0], VersionToken::new("1"));
}

#[test]
fn cluster_policy_changes_checkpoint() {
    let test = TestConfig::default();
    test.apply_cluster(mk_namespace("foo", "1"));
    let initial = test.source.cluster_policy_version();
    let state = test.source.state_version();

    test.apply_cluster(mk_cluster_role("admin", "10"));
    let with_role = test.source.cluster_policy_version();
    assert_ne!(initial, with_role);

    test.apply_cluster(mk_cluster_role_binding("admins", "11"));
    let with_binding = test.source.cluster_policy_version();
    assert_ne!(with_role, with_binding);

    test.apply_cluster(mk_cluster_role("admin", "12"));
    assert_ne!(with_binding, test.source.cluster_policy_version());

    // Cluster policy never changes individual namespace tokens.
    assert_eq!(test.versions(), vec![VersionToken::new("1")]);
    assert_eq!(state, test.source.state_version());
}

#[test]
fn deleting_cluster_policy_moves_checkpoint() {
    let test = TestConfig::default();
    test.apply_cluster(mk_namespace("foo", "1"));
    let initial = test.source.cluster_policy_version();

    test.apply_cluster(mk_cluster_role("admin", "10"));
    test.apply_cluster(mk_cluster_role_binding("admins", "11"));
    let populated = test.source.cluster_policy_version();

    IndexClusterResource::<ClusterRoleBinding>::delete(
        &mut *test.index.write(),
        "admins".to_string(),
    );
    let without_binding = test.source.cluster_policy_version();
    assert_ne!(populated, without_binding);

    IndexClusterResource::<ClusterRole>::delete(&mut *test.index.write(), "admin".to_string());
    assert_eq!(initial, test.source.cluster_policy_version());

    // Deleting an unknown object is not a change.
    IndexClusterResource::<ClusterRole>::delete(&mut *test.index.write(), "admin".to_string());
    assert_eq!(initial, test.source.cluster_policy_version());
}

#[test]
fn reapplying_unchanged_objects_is_not_a_change() {
    let test = TestConfig::default();
    test.apply_cluster(mk_namespace("foo", "1"));
    test.apply_namespaced(mk_role("foo", "viewer", "2"));
    test.apply_cluster(mk_cluster_role("admin", "3"));
    let state = test.source.state_version();
    let cluster = test.source.cluster_policy_version();

    // A watch restart re-applies every live object.
    test.apply_cluster(mk_namespace("foo", "1"));
    test.apply_namespaced(mk_role("foo", "viewer", "2"));
    test.apply_cluster(mk_cluster_role("admin", "3"));
    assert_eq!(state, test.source.state_version());
    assert_eq!(cluster, test.source.cluster_policy_version());

    test.apply_cluster(mk_namespace("foo", "4"));
    assert_ne!(state, test.source.state_version());
}

// === impl TestConfig ===

impl TestConfig {
    fn apply_cluster<T>(&self, resource: T)
    where
        Index: IndexClusterResource<T>,
    {
        IndexClusterResource::<T>::apply(&mut *self.index.write(), resource);
    }

    fn apply_namespaced<T>(&self, resource: T)
    where
        Index: IndexNamespacedResource<T>,
    {
        IndexNamespacedResource::<T>::apply(&mut *self.index.write(), resource);
    }

    /// Returns the version token of every namespace, ordered by name.
    fn versions(&self) -> Vec<VersionToken> {
        self.source
            .list()
            .unwrap()
            .into_iter()
            .map(|r| r.version)
            .collect()
    }

    fn init_tracing() -> tracing::subscriber::DefaultGuard {
        tracing::subscriber::set_default(
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_max_level(tracing::Level::TRACE)
                .finish(),
        )
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        let _tracing = Self::init_tracing();
        let index = Index::shared();
        let source = Index::source(&index);
        Self {
            index,
            source,
            _tracing,
        }
    }
}
