use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TaskId = Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    #[serde(alias = "high", alias = "HIGH")]
    High,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "low", alias = "LOW")]
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "h" => Ok(Self::High),
            "medium" | "med" | "m" => Ok(Self::Medium),
            "low" | "l" => Ok(Self::Low),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subtask {
    pub name: String,

    #[serde(default)]
    pub completed: bool,
}

impl Subtask {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            completed: false,
        }
    }
}

/// A top-level unit of work.
///
/// Progress is never stored when subtasks exist; see [`Task::effective_progress`].
/// `manual_progress` only comes from legacy imports and is ignored as soon as
/// the task has subtasks or is completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub deadline: NaiveDate,
    pub category: String,
    pub priority: Option<Priority>,
    pub subtasks: Vec<Subtask>,
    pub completed: bool,
    pub manual_progress: Option<u8>,
}

impl Task {
    pub fn new(name: String, deadline: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            deadline,
            category: String::new(),
            priority: None,
            subtasks: vec![],
            completed: false,
            manual_progress: None,
        }
    }

    pub fn completed_subtasks(&self) -> usize {
        self.subtasks.iter().filter(|s| s.completed).count()
    }

    pub fn effective_progress(&self) -> u8 {
        let total = self.subtasks.len();
        if total > 0 {
            let pct = 100 * self.completed_subtasks() / total;
            return u8::try_from(pct).unwrap_or(100);
        }

        if self.completed {
            100
        } else {
            self.manual_progress.map(|p| p.min(100)).unwrap_or(0)
        }
    }

    /// Marks the task done and cascades to every subtask. Never runs in reverse.
    pub fn complete(&mut self) {
        self.completed = true;
        for subtask in &mut self.subtasks {
            subtask.completed = true;
        }
    }

    pub fn is_uncategorized(&self) -> bool {
        self.category.trim().is_empty()
    }

    pub fn days_until(&self, today: NaiveDate) -> i64 {
        (self.deadline - today).num_days()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{Priority, Subtask, Task};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn progress_is_floored_share_of_completed_subtasks() {
        let mut task = Task::new("Report".to_string(), date(2026, 3, 1));
        task.subtasks = vec![
            Subtask::new("outline"),
            Subtask::new("draft"),
            Subtask::new("review"),
        ];
        assert_eq!(task.effective_progress(), 0);

        task.subtasks[0].completed = true;
        assert_eq!(task.effective_progress(), 33);

        task.subtasks[1].completed = true;
        assert_eq!(task.effective_progress(), 66);

        task.subtasks[2].completed = true;
        assert_eq!(task.effective_progress(), 100);
    }

    #[test]
    fn progress_without_subtasks_follows_completed_flag() {
        let mut task = Task::new("Call".to_string(), date(2026, 3, 1));
        assert_eq!(task.effective_progress(), 0);
        task.completed = true;
        assert_eq!(task.effective_progress(), 100);
    }

    #[test]
    fn subtask_progress_ignores_parent_latch() {
        let mut task = Task::new("Ship".to_string(), date(2026, 3, 1));
        task.subtasks = vec![Subtask::new("a"), Subtask::new("b")];
        task.complete();
        task.subtasks[1].completed = false;

        assert!(task.completed);
        assert_eq!(task.effective_progress(), 50);
    }

    #[test]
    fn manual_progress_only_counts_without_subtasks() {
        let mut task = Task::new("Legacy".to_string(), date(2026, 3, 1));
        task.manual_progress = Some(40);
        assert_eq!(task.effective_progress(), 40);

        task.subtasks = vec![Subtask::new("only")];
        assert_eq!(task.effective_progress(), 0);

        task.subtasks.clear();
        task.completed = true;
        assert_eq!(task.effective_progress(), 100);
    }

    #[test]
    fn priority_parses_loosely() {
        assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
        assert_eq!(" med ".parse::<Priority>(), Ok(Priority::Medium));
        assert_eq!("l".parse::<Priority>(), Ok(Priority::Low));
        assert!("urgent".parse::<Priority>().is_err());
    }
}
