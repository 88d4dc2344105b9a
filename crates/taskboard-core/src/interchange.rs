//! JSON interchange format.
//!
//! The export shape is an array of task objects. Import is lenient about
//! missing optional fields and a couple of legacy key names, and strict about
//! everything else: any violation rejects the whole payload.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::task::{Priority, Subtask, Task};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,

    #[serde(alias = "text")]
    pub name: String,

    pub deadline: NaiveDate,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub priority: Option<Priority>,

    #[serde(default)]
    pub subtasks: Vec<Subtask>,

    #[serde(alias = "done")]
    pub completed: bool,

    /// Legacy manual progress slider value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: Some(task.id),
            name: task.name.clone(),
            deadline: task.deadline,
            category: task.category.clone(),
            priority: task.priority,
            subtasks: task.subtasks.clone(),
            completed: task.completed,
            progress: if task.subtasks.is_empty() {
                task.manual_progress
            } else {
                None
            },
        }
    }
}

impl TaskRecord {
    fn into_task(self, position: usize) -> StoreResult<Task> {
        if self.name.trim().is_empty() {
            return Err(StoreError::MalformedInput(format!(
                "task {position}: name must not be empty"
            )));
        }

        if let Some(sub_idx) = self.subtasks.iter().position(|s| s.name.trim().is_empty()) {
            return Err(StoreError::MalformedInput(format!(
                "task {position}: subtask {sub_idx} name must not be empty"
            )));
        }

        if let Some(progress) = self.progress
            && progress > 100
        {
            return Err(StoreError::MalformedInput(format!(
                "task {position}: progress {progress} exceeds 100"
            )));
        }

        let manual_progress = if self.subtasks.is_empty() {
            self.progress
        } else {
            if self.progress.is_some() {
                debug!(position, "dropping manual progress on task with subtasks");
            }
            None
        };

        Ok(Task {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            name: self.name,
            deadline: self.deadline,
            category: self.category,
            priority: self.priority,
            subtasks: self.subtasks,
            completed: self.completed,
            manual_progress,
        })
    }
}

/// Validates every record and builds the task list, or fails without
/// producing anything.
pub fn records_into_tasks(records: Vec<TaskRecord>) -> StoreResult<Vec<Task>> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut tasks = Vec::with_capacity(records.len());

    for (position, record) in records.into_iter().enumerate() {
        let task = record.into_task(position)?;
        if !seen.insert(task.id) {
            return Err(StoreError::MalformedInput(format!(
                "task {position}: duplicate id {}",
                task.id
            )));
        }
        tasks.push(task);
    }

    Ok(tasks)
}

pub fn from_json_str(text: &str) -> StoreResult<Vec<TaskRecord>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(StoreError::MalformedInput("empty input".to_string()));
    }
    serde_json::from_str(trimmed).map_err(|err| StoreError::MalformedInput(err.to_string()))
}

pub fn to_json_string(records: &[TaskRecord]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}
