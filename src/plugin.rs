use crate::dto::{CiServerInfo, ScmData, TestsResult};

/// Callbacks the hosting CI plugin supplies.
///
/// The push workers call these to materialize payloads lazily: an item in the
/// logs queue, for example, only names the build, and the console text is
/// fetched from the CI server when the item is actually pushed. Returning
/// `None` means the data no longer exists (build rotated away, job deleted)
/// and the item is dropped without an error.
pub trait PluginServices: Send + Sync {
    /// Identity of the CI server this plugin runs on.
    fn server_info(&self) -> CiServerInfo;

    /// Console log of the given build, if still available.
    fn build_log(&self, job_id: &str, build_id: &str) -> Option<Vec<u8>>;

    /// Test results of the given build, if still available.
    fn tests_result(&self, job_id: &str, build_id: &str) -> Option<TestsResult>;

    /// SCM data recorded for the given build, if any.
    fn scm_data(&self, job_id: &str, build_id: &str) -> Option<ScmData>;
}
