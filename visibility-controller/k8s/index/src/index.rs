use ahash::{AHashMap as HashMap, RandomState};
use parking_lot::RwLock;
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, trace, warn};
use visibility_controller_core::{
    ObservedResource, PolicyChanges, ResourceSource, SourceError, VersionToken,
};
use visibility_controller_k8s_api::{
    self as k8s, ClusterRole, ClusterRoleBinding, ResourceExt, Role, RoleBinding,
};

pub type SharedIndex = Arc<RwLock<Index>>;

/// Holds the resource versions of every object that affects namespace visibility.
#[derive(Debug)]
pub struct Index {
    /// Namespace name -> resource version.
    namespaces: BTreeMap<String, String>,

    /// Namespace name -> roles and bindings in that namespace. Tracked independently of
    /// `namespaces` since policy objects may be observed before their namespace.
    namespaced_policy: HashMap<String, NamespacedPolicy>,

    cluster_roles: BTreeMap<String, String>,
    cluster_role_bindings: BTreeMap<String, String>,

    /// Set once any namespace has been observed. Every cluster has at least the `default` and
    /// `kube-system` namespaces, so an empty index means the watch has not yet synced.
    namespaces_observed: bool,

    /// Incremented on every change to a namespace or namespaced policy object.
    generation: u64,

    /// Fixed per index so that fingerprints are comparable over the life of the process.
    hasher: RandomState,
}

#[derive(Debug, Default, Hash)]
struct NamespacedPolicy {
    roles: BTreeMap<String, String>,
    bindings: BTreeMap<String, String>,
}

/// A read-only handle used by the cache to list namespaces and observe cluster policy.
#[derive(Clone, Debug)]
pub struct Source(SharedIndex);

// === impl Index ===

impl Index {
    pub fn shared() -> SharedIndex {
        Arc::new(RwLock::new(Self {
            namespaces: BTreeMap::new(),
            namespaced_policy: HashMap::default(),
            cluster_roles: BTreeMap::new(),
            cluster_role_bindings: BTreeMap::new(),
            namespaces_observed: false,
            generation: 0,
            hasher: RandomState::new(),
        }))
    }

    pub fn source(index: &SharedIndex) -> Source {
        Source(index.clone())
    }

    pub(crate) fn num_namespaces(&self) -> usize {
        self.namespaces.len()
    }

    pub(crate) fn num_cluster_roles(&self) -> usize {
        self.cluster_roles.len()
    }

    pub(crate) fn num_cluster_role_bindings(&self) -> usize {
        self.cluster_role_bindings.len()
    }

    pub(crate) fn num_namespaced_policies(&self) -> usize {
        self.namespaced_policy
            .values()
            .map(|p| p.roles.len() + p.bindings.len())
            .sum()
    }

    fn list(&self) -> Vec<ObservedResource> {
        self.namespaces
            .iter()
            .map(|(name, resource_version)| ObservedResource {
                name: name.clone(),
                version: self.namespace_version(name, resource_version),
            })
            .collect()
    }

    fn namespace_version(&self, name: &str, resource_version: &str) -> VersionToken {
        match self.namespaced_policy.get(name) {
            Some(policy) => {
                let policy = self.hasher.hash_one(policy);
                VersionToken::new(format!("{resource_version}/{policy:016x}"))
            }
            None => VersionToken::new(resource_version),
        }
    }

    fn cluster_policy_version(&self) -> String {
        let version = self
            .hasher
            .hash_one((&self.cluster_roles, &self.cluster_role_bindings));
        format!("{version:016x}")
    }

    fn apply_namespace(&mut self, name: String, resource_version: String) {
        self.namespaces_observed = true;
        if update(&mut self.namespaces, name, resource_version) {
            self.generation += 1;
        }
    }

    fn delete_namespace(&mut self, name: &str) {
        if self.namespaces.remove(name).is_some() {
            debug!(namespace = %name, "Namespace deleted");
            self.generation += 1;
        }
    }

    fn apply_namespaced_policy(
        &mut self,
        kind: PolicyKind,
        namespace: String,
        name: String,
        resource_version: String,
    ) {
        let policy = self.namespaced_policy.entry(namespace).or_default();
        if update(policy.by_kind(kind), name, resource_version) {
            self.generation += 1;
        }
    }

    fn delete_namespaced_policy(&mut self, kind: PolicyKind, namespace: &str, name: &str) {
        let Some(policy) = self.namespaced_policy.get_mut(namespace) else {
            return;
        };
        if policy.by_kind(kind).remove(name).is_some() {
            self.generation += 1;
        }
        if policy.roles.is_empty() && policy.bindings.is_empty() {
            self.namespaced_policy.remove(namespace);
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum PolicyKind {
    Role,
    Binding,
}

impl NamespacedPolicy {
    fn by_kind(&mut self, kind: PolicyKind) -> &mut BTreeMap<String, String> {
        match kind {
            PolicyKind::Role => &mut self.roles,
            PolicyKind::Binding => &mut self.bindings,
        }
    }
}

/// Records a resource version, returning true if it differs from the previously recorded one.
fn update(versions: &mut BTreeMap<String, String>, name: String, resource_version: String) -> bool {
    versions.insert(name, resource_version.clone()).as_ref() != Some(&resource_version)
}

fn resource_version<T: ResourceExt>(resource: &T) -> String {
    resource.resource_version().unwrap_or_default()
}

impl kubert::index::IndexClusterResource<k8s::Namespace> for Index {
    fn apply(&mut self, ns: k8s::Namespace) {
        let name = ns.name_unchecked();
        let resource_version = resource_version(&ns);
        trace!(namespace = %name, %resource_version, "Indexing namespace");
        self.apply_namespace(name, resource_version);
    }

    fn delete(&mut self, name: String) {
        self.delete_namespace(&name);
    }
}

impl kubert::index::IndexNamespacedResource<Role> for Index {
    fn apply(&mut self, role: Role) {
        let Some(namespace) = role.namespace() else {
            warn!(name = %role.name_unchecked(), "Role must have a namespace");
            return;
        };
        let resource_version = resource_version(&role);
        self.apply_namespaced_policy(
            PolicyKind::Role,
            namespace,
            role.name_unchecked(),
            resource_version,
        );
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.delete_namespaced_policy(PolicyKind::Role, &namespace, &name);
    }
}

impl kubert::index::IndexNamespacedResource<RoleBinding> for Index {
    fn apply(&mut self, binding: RoleBinding) {
        let Some(namespace) = binding.namespace() else {
            warn!(name = %binding.name_unchecked(), "RoleBinding must have a namespace");
            return;
        };
        let resource_version = resource_version(&binding);
        self.apply_namespaced_policy(
            PolicyKind::Binding,
            namespace,
            binding.name_unchecked(),
            resource_version,
        );
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.delete_namespaced_policy(PolicyKind::Binding, &namespace, &name);
    }
}

impl kubert::index::IndexClusterResource<ClusterRole> for Index {
    fn apply(&mut self, role: ClusterRole) {
        let resource_version = resource_version(&role);
        if update(
            &mut self.cluster_roles,
            role.name_unchecked(),
            resource_version,
        ) {
            debug!(name = %role.name_unchecked(), "ClusterRole changed");
        }
    }

    fn delete(&mut self, name: String) {
        if self.cluster_roles.remove(&name).is_some() {
            debug!(%name, "ClusterRole deleted");
        }
    }
}

impl kubert::index::IndexClusterResource<ClusterRoleBinding> for Index {
    fn apply(&mut self, binding: ClusterRoleBinding) {
        let resource_version = resource_version(&binding);
        if update(
            &mut self.cluster_role_bindings,
            binding.name_unchecked(),
            resource_version,
        ) {
            debug!(name = %binding.name_unchecked(), "ClusterRoleBinding changed");
        }
    }

    fn delete(&mut self, name: String) {
        if self.cluster_role_bindings.remove(&name).is_some() {
            debug!(%name, "ClusterRoleBinding deleted");
        }
    }
}

// === impl Source ===

impl ResourceSource for Source {
    fn list(&self) -> Result<Vec<ObservedResource>, SourceError> {
        let index = self.0.read();
        if !index.namespaces_observed {
            return Err(SourceError::Unavailable(
                "namespaces have not been observed".to_string(),
            ));
        }
        Ok(index.list())
    }

    fn state_version(&self) -> String {
        self.0.read().generation.to_string()
    }
}

impl PolicyChanges for Source {
    fn cluster_policy_version(&self) -> String {
        self.0.read().cluster_policy_version()
    }
}
