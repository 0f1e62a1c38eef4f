use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::client::routes;
use crate::context::SdkContext;
use crate::dto::BuildRef;
use crate::error::Result;
use crate::queue::{FileQueue, MemoryQueue, WorkQueue};
use crate::sync::BackoffPolicy;

use super::worker::{self, Preflight, PushHandler, WorkerHandle, DEFAULT_IDLE_INTERVAL};

const RETRY_INTERVAL: Duration = Duration::from_secs(15);

/// Pushes test results for finished builds.
///
/// Before pushing, the server is asked whether it wants results for the job
/// at all (the preflight endpoint); jobs not mapped to any pipeline are
/// skipped without transferring the payload.
pub struct TestResultsService {
    queue: Arc<dyn WorkQueue<BuildRef>>,
    worker: WorkerHandle,
}

impl TestResultsService {
    pub fn start(ctx: Arc<SdkContext>) -> Result<Self> {
        let queue: Arc<dyn WorkQueue<BuildRef>> = match ctx.spool_subdir("tests") {
            Some(dir) => Arc::new(FileQueue::open(dir)?),
            None => Arc::new(MemoryQueue::new()),
        };
        let handler = Arc::new(TestResultsHandler { ctx });
        let worker = worker::spawn(
            handler,
            queue.clone(),
            BackoffPolicy::fixed(RETRY_INTERVAL),
            DEFAULT_IDLE_INTERVAL,
        );
        Ok(Self { queue, worker })
    }

    pub fn enqueue(&self, build: BuildRef) -> Result<()> {
        self.queue.enqueue(build)?;
        self.worker.release_wait();
        Ok(())
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub async fn shutdown(self) {
        self.worker.shutdown().await;
    }
}

struct TestResultsHandler {
    ctx: Arc<SdkContext>,
}

impl PushHandler for TestResultsHandler {
    type Item = BuildRef;

    fn name(&self) -> &'static str {
        "test-results"
    }

    async fn preflight(&self, build: &BuildRef) -> Result<Preflight> {
        let config = self.ctx.config();
        let path = routes::expand(
            routes::TEST_RESULTS_PREFLIGHT,
            &[
                ("shared_space", &routes::encode(&config.shared_space)),
                ("instance", &routes::encode(&config.instance_id)),
                // The server resolves relevance by the pipeline root when the
                // build ran as part of a larger pipeline.
                (
                    "job",
                    &routes::encode(build.root_job_id.as_deref().unwrap_or(&build.job_id)),
                ),
            ],
        );

        let answer = self.ctx.rest().get_text(&path).await?;
        if answer.trim() == "true" {
            Ok(Preflight::Proceed)
        } else {
            Ok(Preflight::Skip)
        }
    }

    async fn push(&self, build: &BuildRef) -> Result<()> {
        let Some(result) = self
            .ctx
            .plugin()
            .tests_result(&build.job_id, &build.build_id)
        else {
            debug!("test results for {build} no longer available, nothing to push");
            return Ok(());
        };
        if result.is_empty() {
            debug!("build {build} produced no test runs, nothing to push");
            return Ok(());
        }

        let config = self.ctx.config();
        let path = routes::expand(
            routes::TEST_RESULTS,
            &[
                ("shared_space", &routes::encode(&config.shared_space)),
                ("instance", &routes::encode(&config.instance_id)),
                ("job", &routes::encode(&build.job_id)),
                ("build", &routes::encode(&build.build_id)),
            ],
        );
        self.ctx.rest().post_json(&path, &result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::{BuildContext, TestRun, TestRunResult, TestsResult};
    use crate::services::test_support::{test_context, wait_until, FakePlugin};

    fn sample_results() -> TestsResult {
        TestsResult {
            build_context: BuildContext {
                server_id: "ci-1".to_string(),
                job_id: "job-a".to_string(),
                build_id: "5".to_string(),
                job_name: None,
                build_name: None,
            },
            test_runs: vec![TestRun {
                module: "core".to_string(),
                package: "app".to_string(),
                class_name: "SmokeTest".to_string(),
                test_name: "test_boot".to_string(),
                result: TestRunResult::Passed,
                duration: 40,
                started: None,
                error_type: None,
                error_msg: None,
                error_stack_trace: None,
                external_report_url: None,
            }],
        }
    }

    #[tokio::test]
    async fn test_results_pushed_when_preflight_accepts() {
        let mut server = mockito::Server::new_async().await;
        let preflight = server
            .mock(
                "GET",
                "/internal-api/shared_spaces/1001/analytics/ci/servers/ci-1\
/jobs/job-a/tests-result-preflight",
            )
            .with_status(200)
            .with_body("true")
            .create_async()
            .await;
        let post = server
            .mock("POST", "/internal-api/shared_spaces/1001/analytics/ci/test-results")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .create_async()
            .await;

        let plugin = FakePlugin::default().with_tests("job-a", "5", sample_results());
        let ctx = test_context(&server.url(), Arc::new(plugin));
        let service = TestResultsService::start(ctx).unwrap();

        service.enqueue(BuildRef::new("job-a", "5")).unwrap();
        wait_until(|| service.queued() == 0).await;
        service.shutdown().await;

        preflight.assert_async().await;
        post.assert_async().await;
    }

    #[tokio::test]
    async fn test_preflight_rejection_skips_push() {
        let mut server = mockito::Server::new_async().await;
        let preflight = server
            .mock(
                "GET",
                "/internal-api/shared_spaces/1001/analytics/ci/servers/ci-1\
/jobs/job-b/tests-result-preflight",
            )
            .with_status(200)
            .with_body("false")
            .create_async()
            .await;
        let post = server
            .mock("POST", "/internal-api/shared_spaces/1001/analytics/ci/test-results")
            .match_query(mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let plugin = FakePlugin::default().with_tests("job-b", "1", sample_results());
        let ctx = test_context(&server.url(), Arc::new(plugin));
        let service = TestResultsService::start(ctx).unwrap();

        service.enqueue(BuildRef::new("job-b", "1")).unwrap();
        wait_until(|| service.queued() == 0).await;
        service.shutdown().await;

        preflight.assert_async().await;
        post.assert_async().await;
    }

    #[tokio::test]
    async fn test_preflight_uses_root_job_when_present() {
        let mut server = mockito::Server::new_async().await;
        let preflight = server
            .mock(
                "GET",
                "/internal-api/shared_spaces/1001/analytics/ci/servers/ci-1\
/jobs/root-pipeline/tests-result-preflight",
            )
            .with_status(200)
            .with_body("false")
            .create_async()
            .await;

        let ctx = test_context(&server.url(), Arc::new(FakePlugin::default()));
        let service = TestResultsService::start(ctx).unwrap();

        service
            .enqueue(BuildRef::new("job-c", "2").with_root("root-pipeline"))
            .unwrap();
        wait_until(|| service.queued() == 0).await;
        service.shutdown().await;

        preflight.assert_async().await;
    }
}
