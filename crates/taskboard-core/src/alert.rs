use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::task::{Task, TaskId};

pub const DEFAULT_THRESHOLD_DAYS: i64 = 1;

/// Remembers which tasks already raised a deadline notice so each one fires at
/// most once for the lifetime of the tracker. The CLI seeds it from the
/// session's alert file so the record outlives a single invocation.
#[derive(Debug, Clone)]
pub struct AlertTracker {
    threshold_days: i64,
    alerted: HashSet<TaskId>,
    dirty: bool,
}

impl Default for AlertTracker {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_DAYS)
    }
}

impl AlertTracker {
    pub fn new(threshold_days: i64) -> Self {
        Self {
            threshold_days,
            alerted: HashSet::new(),
            dirty: false,
        }
    }

    /// Starts from ids that already alerted in an earlier cycle.
    pub fn with_alerted<I>(threshold_days: i64, alerted: I) -> Self
    where
        I: IntoIterator<Item = TaskId>,
    {
        Self {
            threshold_days,
            alerted: alerted.into_iter().collect(),
            dirty: false,
        }
    }

    pub fn threshold_days(&self) -> i64 {
        self.threshold_days
    }

    /// Due within the threshold (or overdue) and not done yet.
    pub fn is_due_soon(&self, task: &Task, today: NaiveDate) -> bool {
        !task.completed && task.days_until(today) <= self.threshold_days
    }

    /// Returns `true` the first time a qualifying task is seen and records it;
    /// every later call for the same task returns `false`.
    pub fn should_alert(&mut self, task: &Task, today: NaiveDate) -> bool {
        if !self.is_due_soon(task, today) || self.alerted.contains(&task.id) {
            return false;
        }
        self.alerted.insert(task.id);
        self.dirty = true;
        debug!(id = %task.id, days_left = task.days_until(today), "deadline alert raised");
        true
    }

    pub fn was_alerted(&self, id: &TaskId) -> bool {
        self.alerted.contains(id)
    }

    /// True once the record differs from what the tracker was seeded with.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Sorted, so the persisted record is stable between saves.
    pub fn alerted_ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<_> = self.alerted.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Drops ids of tasks that are no longer in the collection.
    pub fn retain_known<'a, I>(&mut self, tasks: I)
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let known: HashSet<TaskId> = tasks.into_iter().map(|task| task.id).collect();
        let before = self.alerted.len();
        self.alerted.retain(|id| known.contains(id));
        if self.alerted.len() != before {
            debug!(dropped = before - self.alerted.len(), "forgot alerts for removed tasks");
            self.dirty = true;
        }
    }

    pub fn collect<'a, I>(&mut self, tasks: I, today: NaiveDate) -> Vec<&'a Task>
    where
        I: IntoIterator<Item = &'a Task>,
    {
        tasks
            .into_iter()
            .filter(|task| self.should_alert(task, today))
            .collect()
    }
}
