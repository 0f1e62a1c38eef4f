use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskHttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

/// A task Octane queued for this CI server, received from the long-poll
/// endpoint. The SDK hands it to the plugin and posts the result back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTask {
    pub id: String,
    pub method: TaskHttpMethod,
    /// Server-relative URL describing what is being asked for
    /// (e.g., `.../jobs/job-a/run`).
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
}

/// Outcome of executing a [`PendingTask`], posted back to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl TaskResult {
    pub fn ok(body: Option<String>) -> Self {
        Self { status: 200, body }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            body: None,
        }
    }
}
