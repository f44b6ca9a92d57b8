//! Declarative scaffolding of directory/file templates into a vault.
//!
//! The engine walks a [`TemplateItem`](archivault_core::TemplateItem) tree,
//! creating directories idempotently and seeding files from resolved content
//! templates. Item failures are collected on an explicit
//! [`ScaffoldReport`] instead of aborting the run.

pub mod engine;
pub mod report;

pub use engine::{ScaffoldError, Scaffolder};
pub use report::{ScaffoldFailure, ScaffoldReport, ScaffoldStatus};
