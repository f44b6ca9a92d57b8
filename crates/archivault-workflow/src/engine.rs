use std::collections::BTreeMap;
use std::path::PathBuf;

use archivault_core::render::Render;
use chrono::Utc;
use serde_json::json;

use crate::error::WorkflowError;
use crate::model::{
    default_steps, Step, StepStatus, StepTemplate, Task, TaskPriority, TaskStatus, TaskTemplate,
};
use crate::store::TaskStore;

/// Inputs for task creation. Step sources in priority order: an explicit
/// template, a template id resolved from the vault, the fixed default list.
#[derive(Debug, Clone)]
pub struct NewTask {
    /// Task id (and file name). Derived from the title when omitted.
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<chrono::DateTime<Utc>>,
    pub template: Option<TaskTemplate>,
    pub template_id: Option<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: String::new(),
            category: category.into(),
            priority: None,
            due_date: None,
            template: None,
            template_id: None,
        }
    }
}

/// Step-based task state machine over [`TaskStore`].
///
/// Every transition is a whole-file read-modify-write; exactly one step is
/// in-progress while a task is active and `currentStep` names it.
pub struct WorkflowEngine {
    store: TaskStore,
    renderer: Box<dyn Render>,
}

impl WorkflowEngine {
    pub fn new(root: impl Into<PathBuf>, renderer: Box<dyn Render>) -> Self {
        Self {
            store: TaskStore::new(root),
            renderer,
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Initialize a task: steps in template order, step 1 in-progress, the
    /// rest pending. Also scaffolds the companion solution document.
    pub fn create_task(&self, vault_id: &str, new: NewTask) -> Result<Task, WorkflowError> {
        let step_templates = match (&new.template, &new.template_id) {
            (Some(template), _) => template.steps.clone(),
            (None, Some(template_id)) => self.store.load_template(vault_id, template_id)?.steps,
            (None, None) => default_steps(),
        };
        if step_templates.is_empty() {
            return Err(WorkflowError::InvalidInput(
                "task template has no steps".to_string(),
            ));
        }

        let task_id = new.id.clone().unwrap_or_else(|| slugify(&new.title));
        if self.store.task_path(vault_id, &task_id).exists() {
            return Err(WorkflowError::InvalidInput(format!(
                "task already exists: {task_id}"
            )));
        }

        let now = Utc::now();
        let steps: Vec<Step> = step_templates
            .iter()
            .enumerate()
            .map(|(i, st)| materialize_step(st, i == 0, now))
            .collect();

        let task = Task {
            id: task_id,
            title: new.title,
            status: TaskStatus::InProgress,
            priority: new.priority,
            due_date: new.due_date,
            category: new.category,
            current_step: steps[0].id.clone(),
            steps,
            template_id: new
                .template
                .as_ref()
                .map(|t| t.id.clone())
                .or(new.template_id),
            description: new.description,
            created_at: now,
            updated_at: now,
        };

        self.store.save(vault_id, &task)?;
        self.store.write_solution_stub(vault_id, &task)?;
        Ok(task)
    }

    /// Advance: complete the current step and start the next one. Invalid on
    /// the last step or an unknown step id.
    pub fn go_to_next_step(
        &self,
        vault_id: &str,
        task_id: &str,
        current_step_id: &str,
    ) -> Result<Task, WorkflowError> {
        let mut task = self.store.load(vault_id, task_id)?;
        let index = task
            .step_index(current_step_id)
            .ok_or_else(|| WorkflowError::not_found("step", current_step_id))?;
        if index + 1 >= task.steps.len() {
            return Err(WorkflowError::InvalidInput(format!(
                "step {current_step_id} is the last step; complete the task instead"
            )));
        }

        let now = Utc::now();
        {
            let step = &mut task.steps[index];
            step.status = StepStatus::Completed;
            step.completed_at.get_or_insert(now);
        }
        {
            let next = &mut task.steps[index + 1];
            next.status = StepStatus::InProgress;
            next.started_at.get_or_insert(now);
            task.current_step = next.id.clone();
        }
        task.updated_at = now;

        self.store.save(vault_id, &task)?;
        Ok(task)
    }

    /// Retreat: the current step reverts to pending (clearing `startedAt` if
    /// it was in-progress) and the previous step becomes in-progress again
    /// with its `completedAt` cleared. Invalid on the first step.
    pub fn go_to_previous_step(
        &self,
        vault_id: &str,
        task_id: &str,
        current_step_id: &str,
    ) -> Result<Task, WorkflowError> {
        let mut task = self.store.load(vault_id, task_id)?;
        let index = task
            .step_index(current_step_id)
            .ok_or_else(|| WorkflowError::not_found("step", current_step_id))?;
        if index == 0 {
            return Err(WorkflowError::InvalidInput(format!(
                "step {current_step_id} is the first step"
            )));
        }

        {
            let step = &mut task.steps[index];
            if step.status == StepStatus::InProgress {
                step.status = StepStatus::Pending;
                step.started_at = None;
            }
        }
        {
            let prev = &mut task.steps[index - 1];
            prev.status = StepStatus::InProgress;
            prev.completed_at = None;
            prev.started_at.get_or_insert_with(Utc::now);
            task.current_step = prev.id.clone();
        }
        task.updated_at = Utc::now();

        self.store.save(vault_id, &task)?;
        Ok(task)
    }

    /// Complete the task. Valid only when `step_id` is the last step.
    pub fn complete_task(
        &self,
        vault_id: &str,
        task_id: &str,
        step_id: &str,
    ) -> Result<Task, WorkflowError> {
        let mut task = self.store.load(vault_id, task_id)?;
        let index = task
            .step_index(step_id)
            .ok_or_else(|| WorkflowError::not_found("step", step_id))?;
        if index != task.steps.len() - 1 {
            return Err(WorkflowError::InvalidInput(format!(
                "step {step_id} is not the last step"
            )));
        }

        let now = Utc::now();
        let step = &mut task.steps[index];
        step.status = StepStatus::Completed;
        step.completed_at.get_or_insert(now);
        task.status = TaskStatus::Completed;
        task.updated_at = now;

        self.store.save(vault_id, &task)?;
        Ok(task)
    }

    /// Persist arbitrary form data onto a step without touching its status.
    pub fn save_step_form_data(
        &self,
        vault_id: &str,
        task_id: &str,
        step_id: &str,
        form_data: BTreeMap<String, serde_json::Value>,
    ) -> Result<Task, WorkflowError> {
        let mut task = self.store.load(vault_id, task_id)?;
        let index = task
            .step_index(step_id)
            .ok_or_else(|| WorkflowError::not_found("step", step_id))?;

        task.steps[index].form_data.extend(form_data);
        task.updated_at = Utc::now();

        self.store.save(vault_id, &task)?;
        Ok(task)
    }

    /// Render the step's prompt template. Exposes `task.*`, `step.*`,
    /// `formData`, `formDataItems` (a `[{key, value}]` projection for
    /// template loops) and the computed `solutionFilePath`.
    pub fn generate_step_prompt(
        &self,
        vault_id: &str,
        task_id: &str,
        step_id: &str,
    ) -> Result<String, WorkflowError> {
        let task = self.store.load(vault_id, task_id)?;
        let step = task
            .step(step_id)
            .ok_or_else(|| WorkflowError::not_found("step", step_id))?;
        let body = step
            .prompt
            .as_deref()
            .ok_or_else(|| WorkflowError::not_found("step prompt", step_id))?;

        let form_data_items: Vec<serde_json::Value> = step
            .form_data
            .iter()
            .map(|(key, value)| json!({"key": key, "value": value}))
            .collect();

        let vars = json!({
            "task": {
                "id": task.id,
                "title": task.title,
                "description": task.description,
                "category": task.category,
                "status": task.status,
                "priority": task.priority,
            },
            "step": {
                "id": step.id,
                "type": step.step_type,
                "status": step.status,
            },
            "formData": step.form_data,
            "formDataItems": form_data_items,
            "solutionFilePath": self
                .store
                .solution_path(vault_id, task_id)
                .to_string_lossy(),
        });

        Ok(self.renderer.render(body, &vars)?)
    }
}

fn materialize_step(template: &StepTemplate, first: bool, now: chrono::DateTime<Utc>) -> Step {
    Step {
        id: template.id.clone(),
        step_type: template.step_type.clone(),
        form: template.form.clone(),
        prompt: template.prompt.clone(),
        depends_on: template.depends_on.clone(),
        status: if first {
            StepStatus::InProgress
        } else {
            StepStatus::Pending
        },
        form_data: BTreeMap::new(),
        started_at: first.then_some(now),
        completed_at: None,
    }
}

/// Filesystem-friendly task id derived from a title.
fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "task".to_string()
    } else {
        slug
    }
}
