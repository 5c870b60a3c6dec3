//! # autodev_vcs
//!
//! Publishes generated code to a hosted repository over plain REST calls:
//! a feature branch, one commit per file and a pull (or merge) request.

pub mod error;
pub mod github;
pub mod gitlab;
pub mod manager;
pub mod provider;

pub use error::{VcsError, VcsResult};
pub use github::GitHubClient;
pub use gitlab::GitLabClient;
pub use manager::{feature_branch_name, VcsKind, VersionControlManager, DEFAULT_BASE_BRANCH};
pub use provider::VcsProvider;
