use std::sync::Arc;

use log::{debug, warn};

use crate::client::routes;
use crate::context::SdkContext;
use crate::dto::{PendingTask, TaskResult};
use crate::error::{Result, SdkError};

/// Long-polls the server for pending tasks addressed at this CI server.
///
/// The server holds the connection open until a task arrives or its own
/// long-poll window expires; an expired window surfaces here as a request
/// timeout and yields an empty batch rather than an error.
pub struct TaskPollingService {
    ctx: Arc<SdkContext>,
}

impl TaskPollingService {
    pub fn new(ctx: Arc<SdkContext>) -> Self {
        Self { ctx }
    }

    /// Performs one long-poll cycle and returns the tasks received, if any.
    ///
    /// # Errors
    ///
    /// Connection failures and server errors are returned for the caller to
    /// back off on; a quiet long-poll expiry is not an error.
    pub async fn poll_once(&self) -> Result<Vec<PendingTask>> {
        let config = self.ctx.config();
        let path = routes::expand(
            routes::TASKS,
            &[
                ("shared_space", &routes::encode(&config.shared_space)),
                ("instance", &routes::encode(&config.instance_id)),
                ("server_type", &routes::encode(&config.server_type)),
            ],
        );

        match self.ctx.rest().get_text(&path).await {
            Ok(body) => {
                // Some server versions answer an empty poll with 204 and no
                // body rather than an empty array.
                if body.trim().is_empty() {
                    return Ok(Vec::new());
                }
                let tasks: Vec<PendingTask> = serde_json::from_str(&body)?;
                if !tasks.is_empty() {
                    debug!("received {} pending task(s)", tasks.len());
                }
                Ok(tasks)
            }
            Err(SdkError::Network(e)) if e.is_timeout() => {
                debug!("task long-poll expired without tasks");
                Ok(Vec::new())
            }
            Err(e) => {
                warn!("task polling failed: {e}");
                Err(e)
            }
        }
    }

    /// Reports the outcome of a task back to the server.
    pub async fn submit_result(&self, task_id: &str, result: &TaskResult) -> Result<()> {
        let config = self.ctx.config();
        let path = routes::expand(
            routes::TASK_RESULT,
            &[
                ("shared_space", &routes::encode(&config.shared_space)),
                ("instance", &routes::encode(&config.instance_id)),
                ("task", &routes::encode(task_id)),
            ],
        );
        self.ctx.rest().put_json(&path, result).await
    }
}
