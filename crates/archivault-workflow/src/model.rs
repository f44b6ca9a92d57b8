use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

/// One step of a task's ordered sequence.
///
/// On disk the fields are camelCase except `depends_on`, which the original
/// format spells in snake_case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub step_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(rename = "depends_on", default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub form_data: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// A workflow unit persisted as one YAML file per task, plus a companion
/// free-text solution document.
///
/// Invariant: while the task is active exactly one step is in-progress and
/// `current_step` names it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub category: String,
    pub steps: Vec<Step>,
    pub current_step: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    pub fn step_index(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == step_id)
    }
}

/// Declarative step list used to initialize a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTemplate {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepTemplate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTemplate {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub step_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<serde_json::Value>,
    #[serde(rename = "depends_on", default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl StepTemplate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            step_type: None,
            prompt: None,
            form: None,
            depends_on: Vec::new(),
        }
    }
}

/// The fixed step list used when a task is created without a template.
pub fn default_steps() -> Vec<StepTemplate> {
    let mut analyze = StepTemplate::new("analyze");
    analyze.prompt = Some("Analyze the problem behind task \"{{task.title}}\".\n{{task.description}}\n".into());

    let mut design = StepTemplate::new("design");
    design.prompt = Some("Propose a design for \"{{task.title}}\". Record decisions in {{solutionFilePath}}.\n".into());
    design.depends_on = vec!["analyze".into()];

    let mut implement = StepTemplate::new("implement");
    implement.prompt = Some("Implement the agreed design for \"{{task.title}}\".\n".into());
    implement.depends_on = vec!["design".into()];

    let mut verify = StepTemplate::new("verify");
    verify.prompt = Some("Verify the result of \"{{task.title}}\" against its requirements.\n".into());
    verify.depends_on = vec!["implement".into()];

    vec![analyze, design, implement, verify]
}
