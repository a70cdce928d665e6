use prometheus_client::{
    collector::Collector,
    encoding::{DescriptorEncoder, EncodeMetric},
    metrics::{gauge::ConstGauge, MetricType},
    registry::Registry,
};

use super::SharedIndex;

#[derive(Debug)]
struct Instrumented(SharedIndex);

pub fn register(reg: &mut Registry, index: SharedIndex) {
    reg.register_collector(Box::new(Instrumented(index)));
}

impl Collector for Instrumented {
    fn encode(&self, mut encoder: DescriptorEncoder<'_>) -> Result<(), std::fmt::Error> {
        let this = self.0.read();

        let namespace_encoder = encoder.encode_descriptor(
            "namespace_index_size",
            "The number of entries in the namespace index",
            None,
            MetricType::Gauge,
        )?;
        ConstGauge::new(this.num_namespaces() as i64).encode(namespace_encoder)?;

        let policy_encoder = encoder.encode_descriptor(
            "namespaced_policy_index_size",
            "The number of Roles and RoleBindings in the namespaced policy index",
            None,
            MetricType::Gauge,
        )?;
        ConstGauge::new(this.num_namespaced_policies() as i64).encode(policy_encoder)?;

        let cluster_role_encoder = encoder.encode_descriptor(
            "cluster_role_index_size",
            "The number of entries in the cluster role index",
            None,
            MetricType::Gauge,
        )?;
        ConstGauge::new(this.num_cluster_roles() as i64).encode(cluster_role_encoder)?;

        let cluster_binding_encoder = encoder.encode_descriptor(
            "cluster_role_binding_index_size",
            "The number of entries in the cluster role binding index",
            None,
            MetricType::Gauge,
        )?;
        ConstGauge::new(this.num_cluster_role_bindings() as i64)
            .encode(cluster_binding_encoder)?;

        Ok(())
    }
}
