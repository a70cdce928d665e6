use crate::{
    core::{ReviewError, Reviewer, Subject},
    k8s::{self, LocalResourceAccessReview, ResourceAccessReviewResponse},
};
use tracing::debug;

/// Reviews namespaces with the cluster's resource access review API, which reports every user and
/// group that may perform a verb on the namespace.
#[derive(Clone)]
pub struct AccessReviewer {
    client: k8s::Client,
    verb: String,
}

// === impl AccessReviewer ===

impl AccessReviewer {
    pub fn new(client: k8s::Client, verb: impl ToString) -> Self {
        Self {
            client,
            verb: verb.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Reviewer for AccessReviewer {
    async fn review(&self, namespace: &str) -> Result<Vec<Subject>, ReviewError> {
        let review = LocalResourceAccessReview::for_namespace(namespace, &self.verb);
        let body = serde_json::to_vec(&review).map_err(|e| ReviewError::Failed(e.into()))?;
        let req = http::Request::post(review.path())
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(body)
            .map_err(|e| ReviewError::Failed(e.into()))?;

        let rsp = match self.client.request::<ResourceAccessReviewResponse>(req).await {
            Ok(rsp) => rsp,
            Err(k8s::Error::Api(error)) if error.code == 404 => {
                return Err(ReviewError::Unknown(namespace.to_string()))
            }
            Err(error) => return Err(ReviewError::Failed(error.into())),
        };

        if let Some(error) = rsp.evaluation_error.as_deref().filter(|e| !e.is_empty()) {
            debug!(%namespace, %error, "Access review could not evaluate all rules");
        }
        Ok(subjects(rsp))
    }
}

fn subjects(rsp: ResourceAccessReviewResponse) -> Vec<Subject> {
    let users = rsp.users.unwrap_or_default().into_iter().map(Subject::user);
    let groups = rsp.groups.unwrap_or_default().into_iter().map(Subject::group);
    users.chain(groups).collect()
}
