use std::path::PathBuf;

/// Outcome classification for a scaffolding run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaffoldStatus {
    /// Every item was created.
    Complete,
    /// Some items were created, some failed.
    Partial,
    /// Nothing was created.
    Failed,
}

/// One item that could not be scaffolded. Siblings and unrelated subtrees
/// are unaffected.
#[derive(Debug, Clone)]
pub struct ScaffoldFailure {
    /// Vault-relative path of the failed item.
    pub path: String,
    pub reason: String,
}

/// Explicit partial-success result of a scaffolding run.
///
/// The operation itself returns `Ok` once every item has been attempted;
/// callers distinguish full from partial success through
/// [`ScaffoldReport::status`] instead of digging through logs.
#[derive(Debug, Default)]
pub struct ScaffoldReport {
    /// Absolute paths of created directories and files, in creation order.
    pub created: Vec<PathBuf>,
    pub failures: Vec<ScaffoldFailure>,
}

impl ScaffoldReport {
    pub fn status(&self) -> ScaffoldStatus {
        match (self.created.is_empty(), self.failures.is_empty()) {
            (_, true) => ScaffoldStatus::Complete,
            (true, false) => ScaffoldStatus::Failed,
            (false, false) => ScaffoldStatus::Partial,
        }
    }

    pub(crate) fn record_failure(&mut self, path: impl Into<String>, reason: impl Into<String>) {
        let failure = ScaffoldFailure {
            path: path.into(),
            reason: reason.into(),
        };
        tracing::warn!(path = %failure.path, "Scaffold item failed: {}", failure.reason);
        self.failures.push(failure);
    }
}
