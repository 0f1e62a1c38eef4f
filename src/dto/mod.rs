//! Data-transfer objects exchanged with the Octane server.
//!
//! Every wire shape is a concrete serde struct; the server speaks camelCase
//! JSON throughout.

mod entity;
mod events;
mod scm;
mod tasks;
mod tests_result;
mod vulnerabilities;

pub use entity::{Entity, EntityList};
pub use events::{BuildResult, CiEvent, CiEventBatch, CiEventType, PhaseType};
pub use scm::{ScmChange, ScmChangeType, ScmCommit, ScmData, ScmRepository, ScmType};
pub use tasks::{PendingTask, TaskHttpMethod, TaskResult};
pub use tests_result::{BuildContext, TestRun, TestRunResult, TestsResult};
pub use vulnerabilities::{Issue, IssueSeverity, IssueState};

use serde::{Deserialize, Serialize};

/// Identifies one build of one job; the queue item shape shared by the
/// logs/tests/SCM push queues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRef {
    pub job_id: String,
    pub build_id: String,
    /// Topmost pipeline job when this build ran as part of a larger pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_job_id: Option<String>,
}

impl BuildRef {
    pub fn new(job_id: impl Into<String>, build_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            build_id: build_id.into(),
            root_job_id: None,
        }
    }

    pub fn with_root(mut self, root_job_id: impl Into<String>) -> Self {
        self.root_job_id = Some(root_job_id.into());
        self
    }
}

impl std::fmt::Display for BuildRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.job_id, self.build_id)
    }
}

/// CI server identity sent along with every event batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CiServerInfo {
    pub instance_id: String,
    #[serde(rename = "type")]
    pub server_type: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk_version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_ref_serializes_camel_case() {
        let item = BuildRef::new("job-a", "17").with_root("root-job");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["jobId"], "job-a");
        assert_eq!(json["buildId"], "17");
        assert_eq!(json["rootJobId"], "root-job");
    }

    #[test]
    fn test_build_ref_root_omitted_when_absent() {
        let item = BuildRef::new("job-a", "17");
        let json = serde_json::to_string(&item).unwrap();
        assert!(!json.contains("rootJobId"));
    }

    #[test]
    fn test_build_ref_display() {
        assert_eq!(BuildRef::new("deploy", "42").to_string(), "deploy#42");
    }
}
