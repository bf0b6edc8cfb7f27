//! MapReduce over a pool of polling workers.
//!
//! A single [`Coordinator`] owns all job state and answers one RPC,
//! [`Service::get_task`], which commits the caller's previous result and hands
//! out the next task. [`Worker`]s loop on that call until told to exit.

pub mod app;
pub mod artifact;
pub mod config;
mod coordinator;
mod error;
pub mod partition;
pub mod task;
mod worker;

pub use config::{CoordinatorConfig, WorkerConfig};
pub use coordinator::{Coordinator, Progress};
pub use error::{Error, Result};
pub use task::{KeyValue, TaskAssignment, TaskKind, TaskReport};
pub use worker::{execute_map, execute_reduce, Worker};

#[tarpc::service]
pub trait Service {
    /// Report the task just finished (or [`TaskReport::none`]) and receive the next one.
    async fn get_task(report: TaskReport) -> TaskAssignment;
}
