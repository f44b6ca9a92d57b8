use std::fs;
use std::path::PathBuf;

use archivault_core::layout;
use archivault_core::store::fsutil;

use crate::error::WorkflowError;
use crate::model::{Task, TaskTemplate};

/// Persists tasks as `archi-tasks/<id>.yml` with a companion
/// `archi-tasks/<id>.solution.md` free-text document.
///
/// Every mutation is a whole-file read-modify-write with atomic replace; two
/// concurrent writers race and the later rename wins.
pub struct TaskStore {
    root: PathBuf,
}

impl TaskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn task_path(&self, vault_id: &str, task_id: &str) -> PathBuf {
        self.tasks_dir(vault_id).join(format!("{task_id}.yml"))
    }

    pub fn solution_path(&self, vault_id: &str, task_id: &str) -> PathBuf {
        self.tasks_dir(vault_id).join(format!("{task_id}.solution.md"))
    }

    fn tasks_dir(&self, vault_id: &str) -> PathBuf {
        self.root.join(vault_id).join(layout::TASKS_DIR)
    }

    pub fn load(&self, vault_id: &str, task_id: &str) -> Result<Task, WorkflowError> {
        let path = self.task_path(vault_id, task_id);
        if !path.exists() {
            return Err(WorkflowError::not_found("task", task_id));
        }
        let raw = fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    /// Rewrite the entire task file.
    pub fn save(&self, vault_id: &str, task: &Task) -> Result<(), WorkflowError> {
        let path = self.task_path(vault_id, &task.id);
        let yaml = serde_yaml::to_string(task)?;
        fsutil::atomic_write(&path, yaml.as_bytes())?;
        Ok(())
    }

    /// All tasks of a vault, skipping unparsable files with a warning.
    pub fn list(&self, vault_id: &str) -> Result<Vec<Task>, WorkflowError> {
        let dir = self.tasks_dir(vault_id);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut tasks = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(vault = vault_id, "Skipping unreadable task entry: {e}");
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".yml") {
                continue;
            }
            match fs::read_to_string(entry.path())
                .map_err(WorkflowError::from)
                .and_then(|raw| serde_yaml::from_str::<Task>(&raw).map_err(WorkflowError::from))
            {
                Ok(task) => tasks.push(task),
                Err(e) => {
                    tracing::warn!(vault = vault_id, file = %name, "Skipping unparsable task: {e}");
                }
            }
        }
        tasks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tasks)
    }

    pub fn delete(&self, vault_id: &str, task_id: &str) -> Result<(), WorkflowError> {
        let path = self.task_path(vault_id, task_id);
        if !path.exists() {
            return Err(WorkflowError::not_found("task", task_id));
        }
        fs::remove_file(&path)?;
        // The solution document is companion material; losing it is accepted,
        // failing to delete it is not fatal.
        if let Err(e) = fs::remove_file(self.solution_path(vault_id, task_id)) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(vault = vault_id, task = task_id, "Leaving solution file: {e}");
            }
        }
        Ok(())
    }

    /// Scaffold the companion solution document: one heading per step.
    /// Never overwrites an existing file.
    pub fn write_solution_stub(&self, vault_id: &str, task: &Task) -> Result<(), WorkflowError> {
        let path = self.solution_path(vault_id, &task.id);
        if path.exists() {
            return Ok(());
        }
        let mut body = format!("# {}\n", task.title);
        for step in &task.steps {
            body.push_str(&format!("\n## {}\n", step.id));
        }
        fsutil::atomic_write(&path, body.as_bytes())?;
        Ok(())
    }

    /// Load a task template from the vault's `archi-templates/tasks/`
    /// convention directory.
    pub fn load_template(
        &self,
        vault_id: &str,
        template_id: &str,
    ) -> Result<TaskTemplate, WorkflowError> {
        let path = self
            .root
            .join(vault_id)
            .join(layout::TEMPLATES_DIR)
            .join("tasks")
            .join(format!("{template_id}.yml"));
        if !path.exists() {
            return Err(WorkflowError::not_found("task template", template_id));
        }
        let raw = fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }
}
