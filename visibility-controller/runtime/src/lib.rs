pub use visibility_controller_cache as cache;
pub use visibility_controller_core as core;
pub use visibility_controller_k8s_api as k8s;
pub use visibility_controller_k8s_index as index;

mod args;
mod review;

pub use self::{args::Args, review::AccessReviewer};
