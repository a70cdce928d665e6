//! Wire types for the `authorization.openshift.io/v1` access review API, which reports *who* may
//! perform an action rather than *whether* a given user may.

use serde::{Deserialize, Serialize};

pub const API_VERSION: &str = "authorization.openshift.io/v1";

/// Asks which users and groups may perform `verb` on a resource within `namespace`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalResourceAccessReview {
    pub api_version: String,
    pub kind: String,
    pub namespace: String,
    pub verb: String,
    #[serde(rename = "resourceAPIGroup")]
    pub resource_api_group: String,
    pub resource: String,
    pub resource_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAccessReviewResponse {
    #[serde(default)]
    pub namespace: String,

    #[serde(default)]
    pub users: Option<Vec<String>>,

    #[serde(default)]
    pub groups: Option<Vec<String>>,

    /// Set when some policy rules could not be evaluated. The lists of users and groups may be
    /// incomplete.
    #[serde(default, rename = "evalutionError")]
    pub evaluation_error: Option<String>,
}

impl LocalResourceAccessReview {
    /// Asks who may `verb` the namespace object itself.
    pub fn for_namespace(namespace: impl ToString, verb: impl ToString) -> Self {
        let namespace = namespace.to_string();
        Self {
            api_version: API_VERSION.to_string(),
            kind: "LocalResourceAccessReview".to_string(),
            resource_name: namespace.clone(),
            namespace,
            verb: verb.to_string(),
            resource_api_group: String::new(),
            resource: "namespaces".to_string(),
        }
    }

    pub fn path(&self) -> String {
        format!(
            "/apis/{}/namespaces/{}/localresourceaccessreviews",
            API_VERSION, self.namespace
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_review() {
        let review = LocalResourceAccessReview::for_namespace("foo", "get");
        assert_eq!(
            serde_json::to_value(&review).unwrap(),
            serde_json::json!({
                "apiVersion": "authorization.openshift.io/v1",
                "kind": "LocalResourceAccessReview",
                "namespace": "foo",
                "verb": "get",
                "resourceAPIGroup": "",
                "resource": "namespaces",
                "resourceName": "foo",
            })
        );
        assert_eq!(
            review.path(),
            "/apis/authorization.openshift.io/v1/namespaces/foo/localresourceaccessreviews"
        );
    }

    #[test]
    fn deserializes_response() {
        let rsp: ResourceAccessReviewResponse = serde_json::from_value(serde_json::json!({
            "kind": "ResourceAccessReviewResponse",
            "apiVersion": "authorization.openshift.io/v1",
            "namespace": "foo",
            "users": ["alice", "system:admin"],
            "groups": null,
            "evalutionError": "",
        }))
        .unwrap();
        assert_eq!(
            rsp.users,
            Some(vec!["alice".to_string(), "system:admin".to_string()])
        );
        assert_eq!(rsp.groups, None);
        assert_eq!(rsp.evaluation_error.as_deref(), Some(""));
    }
}
