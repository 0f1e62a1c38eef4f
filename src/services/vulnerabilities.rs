use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::routes;
use crate::context::SdkContext;
use crate::dto::{BuildRef, Issue};
use crate::error::Result;
use crate::queue::{FileQueue, MemoryQueue, WorkQueue};
use crate::sync::BackoffPolicy;

use super::worker::{self, Preflight, PushHandler, WorkerHandle, DEFAULT_IDLE_INTERVAL};

const RETRY_INTERVAL: Duration = Duration::from_secs(15);

/// Security findings of one scanned build, queued as a self-contained item.
///
/// Unlike logs/tests, scan output has no plugin callback to re-fetch it from,
/// so the payload travels with the queue item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerabilityReport {
    pub build: BuildRef,
    pub issues: Vec<Issue>,
}

/// Pushes vulnerability scan results.
pub struct VulnerabilitiesService {
    queue: Arc<dyn WorkQueue<VulnerabilityReport>>,
    worker: WorkerHandle,
}

impl VulnerabilitiesService {
    pub fn start(ctx: Arc<SdkContext>) -> Result<Self> {
        let queue: Arc<dyn WorkQueue<VulnerabilityReport>> =
            match ctx.spool_subdir("vulnerabilities") {
                Some(dir) => Arc::new(FileQueue::open(dir)?),
                None => Arc::new(MemoryQueue::new()),
            };
        let handler = Arc::new(VulnerabilitiesHandler { ctx });
        let worker = worker::spawn(
            handler,
            queue.clone(),
            BackoffPolicy::fixed(RETRY_INTERVAL),
            DEFAULT_IDLE_INTERVAL,
        );
        Ok(Self { queue, worker })
    }

    pub fn enqueue(&self, report: VulnerabilityReport) -> Result<()> {
        self.queue.enqueue(report)?;
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

struct VulnerabilitiesHandler {
    ctx: Arc<SdkContext>,
}

impl PushHandler for VulnerabilitiesHandler {
    type Item = VulnerabilityReport;

    fn name(&self) -> &'static str {
        "vulnerabilities"
    }

    async fn preflight(&self, report: &VulnerabilityReport) -> Result<Preflight> {
        if report.issues.is_empty() {
            return Ok(Preflight::Skip);
        }
        Ok(Preflight::Proceed)
    }

    async fn push(&self, report: &VulnerabilityReport) -> Result<()> {
        let config = self.ctx.config();
        let path = routes::expand(
            routes::VULNERABILITIES,
            &[
                ("shared_space", &routes::encode(&config.shared_space)),
                ("instance", &routes::encode(&config.instance_id)),
                ("job", &routes::encode(&report.build.job_id)),
                ("build", &routes::encode(&report.build.build_id)),
            ],
        );
        self.ctx.rest().post_json(&path, &report.issues).await
    }
}
