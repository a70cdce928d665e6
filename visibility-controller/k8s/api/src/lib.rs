#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod access_review;

pub use self::access_review::{LocalResourceAccessReview, ResourceAccessReviewResponse};
pub use k8s_openapi::api::{
    self,
    core::v1::Namespace,
    rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding},
};
pub use kube::{
    api::{ObjectMeta, ResourceExt},
    Client, Error, Resource,
};
