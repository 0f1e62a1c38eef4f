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

const RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Pushes build console logs.
///
/// Queue items only name the build; the log bytes are fetched from the plugin
/// when the item is pushed, so a long retry window does not pin large
/// payloads in the queue. Durable when a spool directory is configured.
pub struct LogsService {
    queue: Arc<dyn WorkQueue<BuildRef>>,
    worker: WorkerHandle,
}

impl LogsService {
    pub fn start(ctx: Arc<SdkContext>) -> Result<Self> {
        let queue: Arc<dyn WorkQueue<BuildRef>> = match ctx.spool_subdir("logs") {
            Some(dir) => Arc::new(FileQueue::open(dir)?),
            None => Arc::new(MemoryQueue::new()),
        };
        let handler = Arc::new(LogsHandler { ctx });
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

struct LogsHandler {
    ctx: Arc<SdkContext>,
}

impl PushHandler for LogsHandler {
    type Item = BuildRef;

    fn name(&self) -> &'static str {
        "logs"
    }

    async fn preflight(&self, _item: &BuildRef) -> Result<Preflight> {
        // Log pushing is workspace-scoped; without a workspace there is no
        // destination.
        if self.ctx.config().workspace.is_none() {
            return Ok(Preflight::Skip);
        }
        Ok(Preflight::Proceed)
    }

    async fn push(&self, build: &BuildRef) -> Result<()> {
        let Some(log) = self
            .ctx
            .plugin()
            .build_log(&build.job_id, &build.build_id)
        else {
            debug!("console log for {build} no longer available, nothing to push");
            return Ok(());
        };

        let config = self.ctx.config();
        let path = routes::expand(
            routes::BUILD_LOG,
            &[
                ("shared_space", &routes::encode(&config.shared_space)),
                ("workspace", &routes::encode(config.require_workspace()?)),
                ("instance", &routes::encode(&config.instance_id)),
                ("job", &routes::encode(&build.job_id)),
                ("build", &routes::encode(&build.build_id)),
            ],
        );
        self.ctx.rest().post_bytes(&path, "text/plain", log).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{test_context, wait_until, FakePlugin};

    #[tokio::test]
    async fn test_log_pushed_for_queued_build() {
        let mut server = mockito::Server::new_async().await;
        let post = server
            .mock(
                "POST",
                "/internal-api/shared_spaces/1001/workspaces/1002/analytics/ci\
/servers/ci-1/jobs/job-a/builds/17/logs",
            )
            .match_header("content-encoding", "gzip")
            .match_header("content-type", "text/plain")
            .with_status(200)
            .create_async()
            .await;

        let plugin = FakePlugin::default().with_log("job-a", "17", b"build ok\n");
        let ctx = test_context(&server.url(), Arc::new(plugin));
        let service = LogsService::start(ctx).unwrap();

        service.enqueue(BuildRef::new("job-a", "17")).unwrap();
        wait_until(|| service.queued() == 0).await;
        service.shutdown().await;

        post.assert_async().await;
    }

    #[tokio::test]
    async fn test_vanished_log_consumes_item_without_error() {
        let server = mockito::Server::new_async().await;

        // Plugin has no log for this build: the item is consumed quietly and
        // no request reaches the server.
        let ctx = test_context(&server.url(), Arc::new(FakePlugin::default()));
        let service = LogsService::start(ctx).unwrap();

        service.enqueue(BuildRef::new("gone", "1")).unwrap();
        wait_until(|| service.queued() == 0).await;
        service.shutdown().await;
    }
}
