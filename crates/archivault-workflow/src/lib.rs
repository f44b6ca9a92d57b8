//! Step-based task workflow engine.
//!
//! A task is an ordered sequence of steps with explicit statuses, persisted
//! as one YAML file per task in the vault's `archi-tasks/` directory plus a
//! companion free-text solution document. Built entirely on the core stores
//! and the pluggable render capability.

pub mod engine;
pub mod error;
pub mod model;
pub mod store;

pub use engine::{NewTask, WorkflowEngine};
pub use error::WorkflowError;
pub use model::{
    default_steps, Step, StepStatus, StepTemplate, Task, TaskPriority, TaskStatus, TaskTemplate,
};
pub use store::TaskStore;
