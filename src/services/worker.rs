use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::task::JoinHandle;

use crate::error::{FailureKind, Result, SdkError};
use crate::queue::WorkQueue;
use crate::sync::{BackoffPolicy, BreakableWait};

/// Pause between queue polls when the queue is empty.
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_secs(1);

/// Preflight decision for the head item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preflight {
    /// The destination is configured and the target is relevant; push.
    Proceed,
    /// Not worth pushing (target irrelevant, nothing to send); drop the item
    /// without a network call.
    Skip,
}

/// Per-service behavior plugged into the shared push worker.
///
/// The five push services differ only in what an item is, how relevance is
/// checked, and which endpoint the payload goes to; the retry loop around
/// them is identical and lives in [`spawn`].
pub trait PushHandler: Send + Sync + 'static {
    type Item: std::fmt::Debug + Clone + Send + Sync + 'static;

    /// Service name used in logs.
    fn name(&self) -> &'static str;

    /// Cheap relevance check before spending a push.
    fn preflight(&self, item: &Self::Item) -> impl Future<Output = Result<Preflight>> + Send {
        let _ = item;
        async { Ok(Preflight::Proceed) }
    }

    /// Executes one REST call for the item.
    fn push(&self, item: &Self::Item) -> impl Future<Output = Result<()>> + Send;
}

/// Handle to a running worker; dropping it leaves the worker running.
pub struct WorkerHandle {
    stop: Arc<AtomicBool>,
    wait: Arc<BreakableWait>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Stops the worker after the in-flight item, cutting any backoff or idle
    /// sleep short.
    pub async fn shutdown(self) {
        self.stop.store(true, Ordering::SeqCst);
        self.wait.release();
        let _ = self.join.await;
    }

    /// Cuts the current backoff/idle sleep short without stopping the worker;
    /// used when configuration changed and a retry is worth attempting now.
    pub fn release_wait(&self) {
        self.wait.release();
    }
}

/// Spawns the single background worker for a queue.
///
/// The loop runs until shutdown and never terminates on an error: temporary
/// failures retry the same head item after a backoff sleep, while permanent
/// and unexpected failures drop the item so that a poison item cannot stall
/// everything behind it.
pub fn spawn<H: PushHandler>(
    handler: Arc<H>,
    queue: Arc<dyn WorkQueue<H::Item>>,
    backoff: BackoffPolicy,
    idle_interval: Duration,
) -> WorkerHandle {
    let stop = Arc::new(AtomicBool::new(false));
    let wait = Arc::new(BreakableWait::new());

    let join = tokio::spawn(run(
        handler,
        queue,
        backoff,
        idle_interval,
        stop.clone(),
        wait.clone(),
    ));

    WorkerHandle { stop, wait, join }
}

async fn run<H: PushHandler>(
    handler: Arc<H>,
    queue: Arc<dyn WorkQueue<H::Item>>,
    mut backoff: BackoffPolicy,
    idle_interval: Duration,
    stop: Arc<AtomicBool>,
    wait: Arc<BreakableWait>,
) {
    info!("{} worker started", handler.name());

    while !stop.load(Ordering::SeqCst) {
        let item = match queue.peek() {
            Ok(Some(item)) => item,
            Ok(None) => {
                wait.sleep(idle_interval).await;
                continue;
            }
            Err(e) => {
                error!("{} worker failed to read queue head: {e}", handler.name());
                wait.sleep(idle_interval).await;
                continue;
            }
        };

        match attempt(handler.as_ref(), &item).await {
            Attempt::Delivered => {
                backoff.reset();
                complete(handler.name(), queue.as_ref());
            }
            Attempt::Skipped => {
                debug!("{} worker skipped irrelevant item {item:?}", handler.name());
                backoff.reset();
                complete(handler.name(), queue.as_ref());
            }
            Attempt::Failed(e) => match e.kind() {
                FailureKind::Temporary => {
                    let delay = backoff.next();
                    warn!(
                        "{} push of {item:?} failed ({e}), retry #{} in {delay:?}",
                        handler.name(),
                        backoff.attempts(),
                    );
                    wait.sleep(delay).await;
                }
                FailureKind::Permanent => {
                    error!(
                        "{} worker dropping {item:?} after permanent failure: {e}",
                        handler.name()
                    );
                    backoff.reset();
                    complete(handler.name(), queue.as_ref());
                }
                FailureKind::Unexpected => {
                    error!(
                        "{} worker dropping {item:?} after unexpected error: {e}",
                        handler.name()
                    );
                    backoff.reset();
                    complete(handler.name(), queue.as_ref());
                }
            },
        }
    }

    info!("{} worker stopped", handler.name());
}

enum Attempt {
    Delivered,
    Skipped,
    Failed(SdkError),
}

async fn attempt<H: PushHandler>(handler: &H, item: &H::Item) -> Attempt {
    match handler.preflight(item).await {
        Ok(Preflight::Proceed) => {}
        Ok(Preflight::Skip) => return Attempt::Skipped,
        Err(e) => return Attempt::Failed(e),
    }

    match handler.push(item).await {
        Ok(()) => Attempt::Delivered,
        Err(e) => Attempt::Failed(e),
    }
}

fn complete<T>(name: &str, queue: &dyn WorkQueue<T>) {
    if let Err(e) = queue.remove() {
        // The same head will be peeked again; better a duplicate push than a
        // lost queue.
        error!("{name} worker failed to remove processed item: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MemoryQueue;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Handler whose outcomes are scripted per item, recording every attempt.
    struct ScriptedHandler {
        attempts: Mutex<Vec<String>>,
        scripts: Mutex<HashMap<String, Vec<Outcome>>>,
        preflight_skip: Vec<String>,
    }

    #[derive(Clone)]
    enum Outcome {
        Ok,
        Temporary,
        Permanent,
    }

    impl ScriptedHandler {
        fn new(scripts: Vec<(&str, Vec<Outcome>)>) -> Self {
            Self {
                attempts: Mutex::new(Vec::new()),
                scripts: Mutex::new(
                    scripts
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), v))
                        .collect(),
                ),
                preflight_skip: Vec::new(),
            }
        }

        fn attempts(&self) -> Vec<String> {
            self.attempts.lock().unwrap().clone()
        }
    }

    impl PushHandler for ScriptedHandler {
        type Item = String;

        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn preflight(&self, item: &String) -> Result<Preflight> {
            if self.preflight_skip.contains(item) {
                Ok(Preflight::Skip)
            } else {
                Ok(Preflight::Proceed)
            }
        }

        async fn push(&self, item: &String) -> Result<()> {
            self.attempts.lock().unwrap().push(item.clone());

            let mut scripts = self.scripts.lock().unwrap();
            let outcomes = scripts.get_mut(item).expect("unscripted item");
            let outcome = if outcomes.len() > 1 {
                outcomes.remove(0)
            } else {
                outcomes[0].clone()
            };

            match outcome {
                Outcome::Ok => Ok(()),
                Outcome::Temporary => Err(SdkError::Api {
                    status: 503,
                    message: "service busy".to_string(),
                }),
                Outcome::Permanent => Err(SdkError::Api {
                    status: 400,
                    message: "malformed".to_string(),
                }),
            }
        }
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "condition not met within 5s");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn fast_backoff() -> BackoffPolicy {
        BackoffPolicy::fixed(Duration::from_millis(1))
    }

    const FAST_IDLE: Duration = Duration::from_millis(5);

    #[tokio::test]
    async fn test_mixed_outcomes_preserve_fifo_and_never_reprocess() {
        // A fails permanently, B succeeds, C fails once then succeeds.
        let handler = Arc::new(ScriptedHandler::new(vec![
            ("A", vec![Outcome::Permanent]),
            ("B", vec![Outcome::Ok]),
            ("C", vec![Outcome::Temporary, Outcome::Ok]),
        ]));
        let queue: Arc<dyn WorkQueue<String>> = Arc::new(MemoryQueue::new());
        for item in ["A", "B", "C"] {
            queue.enqueue(item.to_string()).unwrap();
        }

        let worker = spawn(handler.clone(), queue.clone(), fast_backoff(), FAST_IDLE);
        wait_until(|| queue.is_empty() && handler.attempts().len() == 4).await;
        worker.shutdown().await;

        // A and B are attempted once each and never reprocessed; C is retried
        // in place without losing its queue position.
        assert_eq!(handler.attempts(), vec!["A", "B", "C", "C"]);
    }

    #[tokio::test]
    async fn test_temporary_failure_keeps_item_queued() {
        let handler = Arc::new(ScriptedHandler::new(vec![(
            "stuck",
            vec![Outcome::Temporary],
        )]));
        let queue: Arc<dyn WorkQueue<String>> = Arc::new(MemoryQueue::new());
        queue.enqueue("stuck".to_string()).unwrap();

        let worker = spawn(handler.clone(), queue.clone(), fast_backoff(), FAST_IDLE);
        wait_until(|| handler.attempts().len() >= 3).await;

        // Retried repeatedly, never removed.
        assert_eq!(queue.len(), 1);
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn test_permanent_failure_removes_item() {
        let handler = Arc::new(ScriptedHandler::new(vec![
            ("bad", vec![Outcome::Permanent]),
            ("good", vec![Outcome::Ok]),
        ]));
        let queue: Arc<dyn WorkQueue<String>> = Arc::new(MemoryQueue::new());
        queue.enqueue("bad".to_string()).unwrap();
        queue.enqueue("good".to_string()).unwrap();

        let worker = spawn(handler.clone(), queue.clone(), fast_backoff(), FAST_IDLE);
        wait_until(|| queue.is_empty()).await;
        worker.shutdown().await;

        // The bad item was dropped after one attempt and did not stall "good".
        assert_eq!(handler.attempts(), vec!["bad", "good"]);
    }

    #[tokio::test]
    async fn test_preflight_skip_drops_without_push() {
        let mut handler = ScriptedHandler::new(vec![("sent", vec![Outcome::Ok])]);
        handler.preflight_skip = vec!["skipped".to_string()];
        let handler = Arc::new(handler);

        let queue: Arc<dyn WorkQueue<String>> = Arc::new(MemoryQueue::new());
        queue.enqueue("skipped".to_string()).unwrap();
        queue.enqueue("sent".to_string()).unwrap();

        let worker = spawn(handler.clone(), queue.clone(), fast_backoff(), FAST_IDLE);
        wait_until(|| queue.is_empty()).await;
        worker.shutdown().await;

        // The skipped item never reached push.
        assert_eq!(handler.attempts(), vec!["sent"]);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_idle_wait() {
        let handler = Arc::new(ScriptedHandler::new(vec![]));
        let queue: Arc<dyn WorkQueue<String>> = Arc::new(MemoryQueue::new());

        // Long idle interval: shutdown must not wait it out.
        let worker = spawn(
            handler,
            queue,
            fast_backoff(),
            Duration::from_secs(600),
        );
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(5), worker.shutdown())
            .await
            .expect("shutdown should interrupt the idle sleep");
    }
}
