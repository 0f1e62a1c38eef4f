use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::client::routes;
use crate::context::SdkContext;
use crate::dto::BuildRef;
use crate::error::Result;
use crate::queue::{FileQueue, MemoryQueue, WorkQueue};
use crate::sync::BackoffPolicy;

use super::worker::{self, PushHandler, WorkerHandle, DEFAULT_IDLE_INTERVAL};

const RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Pushes SCM data (commits and changed files) recorded for builds.
pub struct ScmDataService {
    queue: Arc<dyn WorkQueue<BuildRef>>,
    worker: WorkerHandle,
}

impl ScmDataService {
    pub fn start(ctx: Arc<SdkContext>) -> Result<Self> {
        let queue: Arc<dyn WorkQueue<BuildRef>> = match ctx.spool_subdir("scm") {
            Some(dir) => Arc::new(FileQueue::open(dir)?),
            None => Arc::new(MemoryQueue::new()),
        };
        let handler = Arc::new(ScmHandler { ctx });
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

struct ScmHandler {
    ctx: Arc<SdkContext>,
}

impl PushHandler for ScmHandler {
    type Item = BuildRef;

    fn name(&self) -> &'static str {
        "scm-data"
    }

    async fn push(&self, build: &BuildRef) -> Result<()> {
        let Some(data) = self.ctx.plugin().scm_data(&build.job_id, &build.build_id) else {
            debug!("no SCM data recorded for {build}, nothing to push");
            return Ok(());
        };

        let config = self.ctx.config();
        let path = routes::expand(
            routes::SCM_DATA,
            &[
                ("shared_space", &routes::encode(&config.shared_space)),
                ("instance", &routes::encode(&config.instance_id)),
                ("job", &routes::encode(&build.job_id)),
                ("build", &routes::encode(&build.build_id)),
            ],
        );
        self.ctx.rest().put_json(&path, &data).await
    }
}
