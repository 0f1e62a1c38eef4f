use std::sync::Arc;

use crate::client::routes;
use crate::context::SdkContext;
use crate::dto::{CiEvent, CiEventBatch};
use crate::error::Result;
use crate::queue::{MemoryQueue, WorkQueue};
use crate::sync::BackoffPolicy;

use super::worker::{self, PushHandler, WorkerHandle, DEFAULT_IDLE_INTERVAL};

/// Pushes CI lifecycle events to the server.
///
/// Events describe transient state (build started/finished), so the queue is
/// in-memory only: after a process restart the lost events are stale anyway.
pub struct EventsService {
    queue: Arc<MemoryQueue<CiEvent>>,
    worker: WorkerHandle,
}

impl EventsService {
    pub fn start(ctx: Arc<SdkContext>) -> Self {
        let queue = Arc::new(MemoryQueue::new());
        let handler = Arc::new(EventsHandler { ctx });
        let worker = worker::spawn(
            handler,
            queue.clone() as Arc<dyn WorkQueue<CiEvent>>,
            BackoffPolicy::events(),
            DEFAULT_IDLE_INTERVAL,
        );
        Self { queue, worker }
    }

    /// Queues an event for delivery; returns immediately.
    pub fn enqueue(&self, event: CiEvent) {
        // MemoryQueue::enqueue cannot fail.
        let _ = self.queue.enqueue(event);
        self.worker.release_wait();
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Stops the worker after the in-flight event; queued events are lost.
    pub async fn shutdown(self) {
        self.worker.shutdown().await;
    }
}

struct EventsHandler {
    ctx: Arc<SdkContext>,
}

impl PushHandler for EventsHandler {
    type Item = CiEvent;

    fn name(&self) -> &'static str {
        "events"
    }

    async fn push(&self, event: &CiEvent) -> Result<()> {
        let path = routes::expand(
            routes::EVENTS,
            &[("shared_space", &routes::encode(&self.ctx.config().shared_space))],
        );
        let batch = CiEventBatch {
            server: self.ctx.plugin().server_info(),
            events: vec![event.clone()],
        };
        self.ctx.rest().put_json(&path, &batch).await
    }
}
