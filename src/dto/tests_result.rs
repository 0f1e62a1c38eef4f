use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestRunResult {
    Passed,
    Failed,
    Skipped,
}

/// Build the test results belong to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildContext {
    pub server_id: String,
    pub job_id: String,
    pub build_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_name: Option<String>,
}

/// One executed test.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRun {
    pub module: String,
    pub package: String,
    pub class_name: String,
    pub test_name: String,
    pub result: TestRunResult,
    /// Milliseconds.
    pub duration: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_stack_trace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_report_url: Option<String>,
}

/// Full test payload pushed for one build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestsResult {
    pub build_context: BuildContext,
    pub test_runs: Vec<TestRun>,
}

impl TestsResult {
    /// True when there is nothing worth sending.
    pub fn is_empty(&self) -> bool {
        self.test_runs.is_empty()
    }
}
