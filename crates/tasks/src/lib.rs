//! Task management for taskdeck
//!
//! Tasks are persisted with an internal status vocabulary
//! (`todo` / `in-progress` / `completed`) plus a `completed` flag, and are
//! presented over the API with the external vocabulary
//! (`todo` / `in-progress` / `done`). The mapping rules live in [`reconcile`].

pub mod models;
pub mod reconcile;
pub mod stats;
pub mod store;

pub use models::{
    parse_deadline, ExternalStatus, Priority, Task, TaskStatus, TaskView, ValidationError,
};
pub use reconcile::{NewTask, TaskPatch};
pub use stats::TaskStatistics;
pub use store::Store;
