use std::cmp::Ordering;
use std::str::FromStr;

use clap::ValueEnum;
use tracing::trace;

use crate::task::{Priority, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriorityFilter {
    #[default]
    All,
    Only(Priority),
}

impl FromStr for PriorityFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<Priority>().map(Self::Only)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StatusFilter {
    #[default]
    All,
    Incomplete,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SortKey {
    #[default]
    None,
    Deadline,
    Priority,
    Name,
    Progress,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s.trim(), true)
    }
}

/// View-level selection over the task collection. Never reorders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub category: Option<String>,
    pub priority: PriorityFilter,
    pub status: StatusFilter,
    pub text: Option<String>,
}

impl TaskQuery {
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_priority(mut self, priority: PriorityFilter) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn matches(&self, task: &Task) -> bool {
        let category_ok = match self.category.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(category) => task.category.trim() == category,
        };

        let priority_ok = match self.priority {
            PriorityFilter::All => true,
            PriorityFilter::Only(p) => task.priority == Some(p),
        };

        let status_ok = match self.status {
            StatusFilter::All => true,
            StatusFilter::Incomplete => !task.completed,
            StatusFilter::Complete => task.completed,
        };

        let text_ok = match self.text.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(text) => task
                .name
                .to_lowercase()
                .contains(&text.to_lowercase()),
        };

        let ok = category_ok && priority_ok && status_ok && text_ok;
        trace!(
            id = %task.id,
            category_ok,
            priority_ok,
            status_ok,
            text_ok,
            "task query evaluation"
        );
        ok
    }
}

impl SortKey {
    /// Orders two tasks for display; callers rely on a stable sort so ties keep
    /// collection order.
    pub fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            Self::None => Ordering::Equal,
            Self::Deadline => a.deadline.cmp(&b.deadline),
            Self::Priority => priority_rank(a.priority).cmp(&priority_rank(b.priority)),
            Self::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            Self::Progress => a.effective_progress().cmp(&b.effective_progress()),
        }
    }
}

fn priority_rank(priority: Option<Priority>) -> u8 {
    match priority {
        Some(Priority::High) => 0,
        Some(Priority::Medium) => 1,
        Some(Priority::Low) => 2,
        None => 3,
    }
}
