use std::collections::BTreeMap;

use serde::Serialize;

use crate::store::TaskView;

/// Aggregate numbers over a query result, grouped the way the dashboard
/// charts consume them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub completed: usize,
    pub average_progress: u8,
    pub by_category: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
}

impl Summary {
    pub fn from_views(views: &[TaskView<'_>]) -> Self {
        let mut summary = Self {
            total: views.len(),
            ..Self::default()
        };

        let mut progress_sum = 0usize;
        for view in views {
            progress_sum += usize::from(view.progress);
            if view.task.completed {
                summary.completed += 1;
            }

            let category = if view.task.is_uncategorized() {
                "uncategorized".to_string()
            } else {
                view.task.category.clone()
            };
            *summary.by_category.entry(category).or_default() += 1;

            let priority = view
                .task
                .priority
                .map(|p| p.to_string())
                .unwrap_or_else(|| "none".to_string());
            *summary.by_priority.entry(priority).or_default() += 1;
        }

        if !views.is_empty() {
            summary.average_progress = u8::try_from(progress_sum / views.len()).unwrap_or(100);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::Summary;
    use crate::filter::TaskQuery;
    use crate::store::TaskStore;
    use crate::task::Priority;

    #[test]
    fn empty_view_summarises_to_zero() {
        let summary = Summary::from_views(&[]);
        assert_eq!(summary, Summary::default());
    }

    #[test]
    fn counts_and_average_progress() {
        let deadline = NaiveDate::from_ymd_opt(2026, 2, 1).expect("valid date");
        let mut store = TaskStore::new();
        store.add_task("a", deadline, "Work", Some(Priority::High), ["x", "y", "z"]);
        store.add_task("b", deadline, "", None, Vec::<String>::new());
        store.add_task("c", deadline, "Work", Some(Priority::High), Vec::<String>::new());
        store.toggle_subtask(0, 0, true).expect("toggle");
        store.complete_task(2).expect("complete");

        let views = store.query(&TaskQuery::default());
        let summary = Summary::from_views(&views);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.completed, 1);
        // (33 + 0 + 100) / 3
        assert_eq!(summary.average_progress, 44);
        assert_eq!(summary.by_category.get("Work"), Some(&2));
        assert_eq!(summary.by_category.get("uncategorized"), Some(&1));
        assert_eq!(summary.by_priority.get("High"), Some(&2));
        assert_eq!(summary.by_priority.get("none"), Some(&1));
    }
}
