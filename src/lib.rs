//! SDK for connecting CI servers to the Octane ALM/DevOps platform.
//!
//! The SDK pushes build, test, SCM, log and vulnerability data to an Octane
//! server, polls it for pending tasks, and fetches pull-request/branch data
//! from SCM providers on the server's behalf.
//!
//! The hosting CI plugin supplies a [`plugin::PluginServices`] implementation
//! and constructs an [`context::SdkContext`]; each push service owns one
//! background worker that drains its queue strictly in FIFO order, retrying
//! temporary failures with backoff and dropping permanently failed items.

pub mod client;
pub mod config;
pub mod context;
pub mod dto;
pub mod error;
pub mod fetch;
pub mod plugin;
pub mod query;
pub mod queue;
pub mod services;
pub mod sync;

pub use config::OctaneConfig;
pub use context::SdkContext;
pub use error::{FailureKind, Result, SdkError};
