use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CiServerInfo;

/// Lifecycle events a CI job reports to Octane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CiEventType {
    Started,
    Finished,
    Scm,
    Deleted,
    Removed,
}

/// Whether the job ran as a top-level pipeline phase or a nested one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseType {
    Internal,
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildResult {
    Success,
    Failure,
    Aborted,
    Unstable,
    Unavailable,
}

/// One CI lifecycle event.
///
/// `project` carries the CI job identifier; Octane resolves it against the
/// pipeline topology it already knows for this CI server instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CiEvent {
    pub event_type: CiEventType,
    pub project: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_ci_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_ci_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_type: Option<PhaseType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// Milliseconds the build is expected to run, from historic averages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<u64>,
    /// Milliseconds the build actually ran; only set on `Finished`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<BuildResult>,
}

impl CiEvent {
    pub fn started(project: impl Into<String>, build_ci_id: impl Into<String>) -> Self {
        Self {
            event_type: CiEventType::Started,
            project: project.into(),
            build_ci_id: Some(build_ci_id.into()),
            number: None,
            parent_ci_id: None,
            phase_type: None,
            start_time: Some(Utc::now()),
            estimated_duration: None,
            duration: None,
            result: None,
        }
    }

    pub fn finished(
        project: impl Into<String>,
        build_ci_id: impl Into<String>,
        result: BuildResult,
        duration_ms: u64,
    ) -> Self {
        Self {
            event_type: CiEventType::Finished,
            project: project.into(),
            build_ci_id: Some(build_ci_id.into()),
            number: None,
            parent_ci_id: None,
            phase_type: None,
            start_time: None,
            estimated_duration: None,
            duration: Some(duration_ms),
            result: Some(result),
        }
    }
}

/// Envelope the events endpoint expects: the reporting server plus a list of
/// events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CiEventBatch {
    pub server: CiServerInfo,
    pub events: Vec<CiEvent>,
}
