//! Per-feature services.
//!
//! Each push service owns one FIFO queue and one background worker built on
//! [`worker::spawn`]; the task-polling and entity services are plain request
//! helpers with no queue.

pub mod entities;
pub mod events;
pub mod logs;
pub mod scm;
pub mod tasks;
pub mod test_results;
pub mod vulnerabilities;
pub mod worker;

pub use entities::EntitiesService;
pub use events::EventsService;
pub use logs::LogsService;
pub use scm::ScmDataService;
pub use tasks::TaskPollingService;
pub use test_results::TestResultsService;
pub use vulnerabilities::{VulnerabilitiesService, VulnerabilityReport};
pub use worker::{Preflight, PushHandler, WorkerHandle};
