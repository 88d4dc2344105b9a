use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::filter::{SortKey, TaskQuery};
use crate::interchange::{TaskRecord, records_into_tasks};
use crate::task::{Priority, Subtask, Task, TaskId};

/// A task annotated for display: its position in the collection and its
/// derived progress.
#[derive(Debug, Clone, Copy)]
pub struct TaskView<'a> {
    pub index: usize,
    pub task: &'a Task,
    pub progress: u8,
}

/// The ordered task collection for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, index: usize) -> StoreResult<&Task> {
        self.tasks
            .get(index)
            .ok_or_else(|| StoreError::task_index(index, self.tasks.len()))
    }

    fn get_mut(&mut self, index: usize) -> StoreResult<&mut Task> {
        let len = self.tasks.len();
        self.tasks
            .get_mut(index)
            .ok_or_else(|| StoreError::task_index(index, len))
    }

    /// Appends a new task. A blank `name` is silently ignored and yields `None`.
    /// Text is stored as entered; whitespace only matters for the blank check,
    /// and blank subtask names are dropped.
    #[tracing::instrument(skip(self, subtask_names))]
    pub fn add_task<I, S>(
        &mut self,
        name: &str,
        deadline: NaiveDate,
        category: &str,
        priority: Option<Priority>,
        subtask_names: I,
    ) -> Option<&Task>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if name.trim().is_empty() {
            debug!("ignoring add with blank task name");
            return None;
        }

        let mut task = Task::new(name.to_string(), deadline);
        task.category = category.to_string();
        task.priority = priority;
        task.subtasks = subtask_names
            .into_iter()
            .filter_map(|raw| {
                let raw = raw.as_ref();
                (!raw.trim().is_empty()).then(|| Subtask::new(raw))
            })
            .collect();

        debug!(id = %task.id, subtasks = task.subtasks.len(), "task added");
        self.tasks.push(task);
        self.tasks.last()
    }

    #[tracing::instrument(skip(self))]
    pub fn complete_task(&mut self, index: usize) -> StoreResult<()> {
        let task = self.get_mut(index)?;
        task.complete();
        debug!(id = %task.id, "task completed");
        Ok(())
    }

    /// Clears the task's own done flag. Subtasks keep their state.
    #[tracing::instrument(skip(self))]
    pub fn reopen_task(&mut self, index: usize) -> StoreResult<()> {
        let task = self.get_mut(index)?;
        task.completed = false;
        debug!(id = %task.id, "task reopened");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn toggle_subtask(
        &mut self,
        task_index: usize,
        subtask_index: usize,
        value: bool,
    ) -> StoreResult<()> {
        let task = self.get_mut(task_index)?;
        let len = task.subtasks.len();
        let subtask = task
            .subtasks
            .get_mut(subtask_index)
            .ok_or_else(|| StoreError::subtask_index(subtask_index, len))?;
        subtask.completed = value;
        Ok(())
    }

    /// Returns `false` when the name is blank and nothing was added.
    #[tracing::instrument(skip(self))]
    pub fn add_subtask(&mut self, task_index: usize, name: &str) -> StoreResult<bool> {
        let task = self.get_mut(task_index)?;
        if name.trim().is_empty() {
            debug!("ignoring blank subtask name");
            return Ok(false);
        }
        task.subtasks.push(Subtask::new(name));
        Ok(true)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete_task(&mut self, index: usize) -> StoreResult<Task> {
        if index >= self.tasks.len() {
            return Err(StoreError::task_index(index, self.tasks.len()));
        }
        let removed = self.tasks.remove(index);
        debug!(id = %removed.id, "task deleted");
        Ok(removed)
    }

    /// Removes every task matching `predicate` in a single pass.
    #[tracing::instrument(skip(self, predicate))]
    pub fn delete_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&Task) -> bool,
    {
        let before = self.tasks.len();
        self.tasks.retain(|task| !predicate(task));
        let removed = before - self.tasks.len();
        info!(before, after = self.tasks.len(), "removed matching tasks");
        removed
    }

    /// Rearranges the collection to follow `ids`, which must be a permutation
    /// of the current task ids. On failure the order is unchanged.
    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    pub fn reorder(&mut self, ids: &[TaskId]) -> StoreResult<()> {
        if ids.len() != self.tasks.len() {
            return Err(StoreError::InvalidPermutation(format!(
                "expected {} ids, got {}",
                self.tasks.len(),
                ids.len()
            )));
        }

        let mut positions: HashMap<TaskId, usize> = self
            .tasks
            .iter()
            .enumerate()
            .map(|(idx, task)| (task.id, idx))
            .collect();

        let mut order = Vec::with_capacity(ids.len());
        for id in ids {
            let idx = positions.remove(id).ok_or_else(|| {
                StoreError::InvalidPermutation(format!("unknown or repeated task id {id}"))
            })?;
            order.push(idx);
        }

        let mut slots: Vec<Option<Task>> = self.tasks.drain(..).map(Some).collect();
        self.tasks = order
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .collect();

        debug!("tasks reordered");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn move_task(&mut self, from: usize, to: usize) -> StoreResult<()> {
        let len = self.tasks.len();
        if from >= len {
            return Err(StoreError::task_index(from, len));
        }
        if to >= len {
            return Err(StoreError::task_index(to, len));
        }
        let task = self.tasks.remove(from);
        self.tasks.insert(to, task);
        Ok(())
    }

    /// Filtered view in collection order.
    pub fn query(&self, query: &TaskQuery) -> Vec<TaskView<'_>> {
        self.tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| query.matches(task))
            .map(|(index, task)| TaskView {
                index,
                task,
                progress: task.effective_progress(),
            })
            .collect()
    }

    pub fn sorted_query(&self, query: &TaskQuery, sort: SortKey) -> Vec<TaskView<'_>> {
        let mut views = self.query(query);
        if sort != SortKey::None {
            views.sort_by(|a, b| sort.compare(a.task, b.task));
        }
        views
    }

    pub fn tasks_due_on(&self, date: NaiveDate) -> Vec<&Task> {
        self.tasks.iter().filter(|task| task.deadline == date).collect()
    }

    pub fn export(&self) -> Vec<TaskRecord> {
        self.tasks.iter().map(TaskRecord::from).collect()
    }

    /// Replaces the whole collection. Nothing changes unless every record is valid.
    #[tracing::instrument(skip(self, records), fields(count = records.len()))]
    pub fn import(&mut self, records: Vec<TaskRecord>) -> StoreResult<()> {
        let tasks = records_into_tasks(records)?;
        info!(previous = self.tasks.len(), imported = tasks.len(), "replacing task collection");
        self.tasks = tasks;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::TaskStore;
    use crate::error::StoreError;
    use crate::filter::{SortKey, StatusFilter, TaskQuery};
    use crate::task::Priority;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn store_with(names: &[&str]) -> TaskStore {
        let mut store = TaskStore::new();
        for name in names {
            store.add_task(name, date(2026, 6, 1), "", None, Vec::<String>::new());
        }
        store
    }

    fn names(store: &TaskStore) -> Vec<&str> {
        store.tasks().iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn add_task_builds_incomplete_subtasks() {
        let mut store = TaskStore::new();
        let task = store
            .add_task(
                "  Move house ",
                date(2026, 6, 1),
                " Home ",
                Some(Priority::High),
                ["pack", " ", "rent van "],
            )
            .expect("task added");

        assert_eq!(task.name, "  Move house ");
        assert_eq!(task.category, " Home ");
        assert_eq!(task.subtasks[1].name, "rent van ");
        assert!(!task.completed);
        assert_eq!(task.subtasks.len(), 2);
        assert!(task.subtasks.iter().all(|s| !s.completed));
    }

    #[test]
    fn blank_name_is_ignored() {
        let mut store = TaskStore::new();
        assert!(store.add_task("   ", date(2026, 6, 1), "", None, ["x"]).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn complete_cascades_and_is_idempotent() {
        let mut store = TaskStore::new();
        store.add_task("t", date(2026, 6, 1), "", None, ["A", "B"]);

        store.complete_task(0).expect("complete");
        let once = store.clone();
        store.complete_task(0).expect("complete again");

        assert_eq!(store, once);
        let task = store.get(0).expect("task");
        assert!(task.completed);
        assert!(task.subtasks.iter().all(|s| s.completed));
        assert_eq!(task.effective_progress(), 100);
    }

    #[test]
    fn toggling_a_subtask_leaves_parent_flag_alone() {
        let mut store = TaskStore::new();
        store.add_task("t", date(2026, 6, 1), "", None, ["A", "B"]);
        store.complete_task(0).expect("complete");

        store.toggle_subtask(0, 1, false).expect("toggle");
        let task = store.get(0).expect("task");
        assert!(task.completed);
        assert_eq!(task.effective_progress(), 50);

        store.reopen_task(0).expect("reopen");
        store.toggle_subtask(0, 1, true).expect("toggle");
        let task = store.get(0).expect("task");
        assert!(!task.completed);
        assert_eq!(task.effective_progress(), 100);
    }

    #[test]
    fn bad_indices_are_out_of_range() {
        let mut store = store_with(&["a"]);
        assert_eq!(
            store.complete_task(3),
            Err(StoreError::OutOfRange {
                what: "task",
                index: 3,
                len: 1
            })
        );
        assert_eq!(
            store.toggle_subtask(0, 0, true),
            Err(StoreError::OutOfRange {
                what: "subtask",
                index: 0,
                len: 0
            })
        );
        assert!(store.delete_task(1).is_err());
        assert!(store.move_task(0, 1).is_err());
        assert!(store.add_subtask(2, "x").is_err());
    }

    #[test]
    fn delete_keeps_remaining_order() {
        let mut store = store_with(&["TaskA", "TaskB", "TaskC"]);
        let removed = store.delete_task(1).expect("delete");
        assert_eq!(removed.name, "TaskB");
        assert_eq!(names(&store), vec!["TaskA", "TaskC"]);
    }

    #[test]
    fn delete_where_clears_completed() {
        let mut store = store_with(&["a", "b", "c", "d"]);
        store.complete_task(0).expect("complete");
        store.complete_task(2).expect("complete");

        assert_eq!(store.delete_where(|t| t.completed), 2);
        assert_eq!(names(&store), vec!["b", "d"]);
    }

    #[test]
    fn reorder_applies_permutation() {
        let mut store = store_with(&["a", "b", "c"]);
        let ids: Vec<_> = store.tasks().iter().rev().map(|t| t.id).collect();

        store.reorder(&ids).expect("reorder");
        assert_eq!(names(&store), vec!["c", "b", "a"]);
    }

    #[test]
    fn reorder_rejects_mismatched_payloads() {
        let mut store = store_with(&["a", "b", "c"]);
        let before = store.clone();
        let ids: Vec<_> = store.tasks().iter().map(|t| t.id).collect();

        let missing = vec![ids[0], ids[1]];
        let repeated = vec![ids[0], ids[1], ids[1]];
        let unknown = vec![ids[0], ids[1], uuid::Uuid::new_v4()];

        for payload in [missing, repeated, unknown] {
            assert!(matches!(
                store.reorder(&payload),
                Err(StoreError::InvalidPermutation(_))
            ));
            assert_eq!(store, before);
        }
    }

    #[test]
    fn move_task_shifts_neighbours() {
        let mut store = store_with(&["a", "b", "c", "d"]);
        store.move_task(3, 1).expect("move");
        assert_eq!(names(&store), vec!["a", "d", "b", "c"]);
    }

    #[test]
    fn query_preserves_order_and_annotates_progress() {
        let mut store = TaskStore::new();
        store.add_task("a", date(2026, 6, 1), "", None, ["x", "y", "z"]);
        store.add_task("b", date(2026, 6, 1), "", None, Vec::<String>::new());
        store.add_task("c", date(2026, 6, 1), "", None, Vec::<String>::new());
        store.toggle_subtask(0, 0, true).expect("toggle");
        store.complete_task(0).expect("complete");
        store.complete_task(2).expect("complete");
        store.toggle_subtask(0, 2, false).expect("toggle");

        let before = store.clone();
        let done = store.query(&TaskQuery::default().with_status(StatusFilter::Complete));
        let picked: Vec<_> = done
            .iter()
            .map(|v| (v.index, v.task.name.as_str(), v.progress))
            .collect();

        assert_eq!(picked, vec![(0, "a", 66), (2, "c", 100)]);
        assert_eq!(store, before);
    }

    #[test]
    fn sorted_query_is_stable_and_non_mutating() {
        let mut store = TaskStore::new();
        store.add_task("late", date(2026, 6, 9), "", None, Vec::<String>::new());
        store.add_task("early-1", date(2026, 6, 1), "", None, Vec::<String>::new());
        store.add_task("early-2", date(2026, 6, 1), "", None, Vec::<String>::new());

        let sorted: Vec<_> = store
            .sorted_query(&TaskQuery::default(), SortKey::Deadline)
            .iter()
            .map(|v| v.task.name.clone())
            .collect();

        assert_eq!(sorted, vec!["early-1", "early-2", "late"]);
        assert_eq!(names(&store), vec!["late", "early-1", "early-2"]);
    }

    #[test]
    fn tasks_due_on_matches_exact_date() {
        let mut store = TaskStore::new();
        store.add_task("a", date(2026, 6, 1), "", None, Vec::<String>::new());
        store.add_task("b", date(2026, 6, 2), "", None, Vec::<String>::new());
        store.add_task("c", date(2026, 6, 1), "", None, Vec::<String>::new());

        let due: Vec<_> = store
            .tasks_due_on(date(2026, 6, 1))
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(due, vec!["a", "c"]);
    }

    #[test]
    fn import_export_round_trip() {
        let mut store = TaskStore::new();
        store.add_task("a", date(2026, 6, 1), "Work", Some(Priority::Low), ["x", "y"]);
        store.add_task("b", date(2026, 6, 2), "", None, Vec::<String>::new());
        store.toggle_subtask(0, 1, true).expect("toggle");
        store.complete_task(1).expect("complete");

        let mut restored = TaskStore::new();
        restored.import(store.export()).expect("import");
        assert_eq!(restored, store);
    }

    #[test]
    fn failed_import_keeps_previous_collection() {
        let mut store = store_with(&["keep me"]);
        let before = store.clone();

        let mut records = store.export();
        records.push(records[0].clone());

        assert!(matches!(
            store.import(records),
            Err(StoreError::MalformedInput(_))
        ));
        assert_eq!(store, before);
    }
}
