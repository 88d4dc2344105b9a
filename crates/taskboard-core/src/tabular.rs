//! Lossy projections of the task collection: a flat CSV table and an HTML
//! report. Neither can be imported back; use [`crate::interchange`] for that.

use std::fmt::Write as _;

use chrono::NaiveDate;

use crate::store::TaskStore;

pub const CSV_HEADER: [&str; 6] = [
    "name",
    "deadline",
    "category",
    "priority",
    "progress",
    "completed",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularRow {
    pub name: String,
    pub deadline: NaiveDate,
    pub category: String,
    pub priority: String,
    pub progress: u8,
    pub completed: bool,
}

impl TabularRow {
    fn cells(&self) -> [String; 6] {
        [
            self.name.clone(),
            self.deadline.format("%Y-%m-%d").to_string(),
            self.category.clone(),
            self.priority.clone(),
            self.progress.to_string(),
            self.completed.to_string(),
        ]
    }
}

pub fn tabular_rows(store: &TaskStore) -> Vec<TabularRow> {
    store
        .tasks()
        .iter()
        .map(|task| TabularRow {
            name: task.name.clone(),
            deadline: task.deadline,
            category: task.category.clone(),
            priority: task.priority.map(|p| p.to_string()).unwrap_or_default(),
            progress: task.effective_progress(),
            completed: task.completed,
        })
        .collect()
}

pub fn to_csv(rows: &[TabularRow]) -> String {
    let mut out = String::new();
    push_csv_line(&mut out, CSV_HEADER.iter().map(|h| h.to_string()));
    for row in rows {
        push_csv_line(&mut out, row.cells());
    }
    out
}

fn push_csv_line<I>(out: &mut String, cells: I)
where
    I: IntoIterator<Item = String>,
{
    for (idx, cell) in cells.into_iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        if cell.contains(',') || cell.contains('"') || cell.contains('\n') {
            let escaped = cell.replace('"', "\"\"");
            out.push('"');
            out.push_str(&escaped);
            out.push('"');
        } else {
            out.push_str(&cell);
        }
    }
    out.push('\n');
}

pub fn to_html_report(store: &TaskStore, title: &str) -> String {
    let mut out = String::new();
    let title = escape_html(title);

    // Writing into a String cannot fail.
    let _ = writeln!(out, "<!DOCTYPE html>");
    let _ = writeln!(out, "<html><head><meta charset=\"utf-8\"><title>{title}</title></head>");
    let _ = writeln!(out, "<body>");
    let _ = writeln!(out, "<h1>{title}</h1>");

    if store.is_empty() {
        let _ = writeln!(out, "<p>No tasks.</p>");
    }

    for task in store.tasks() {
        let category = if task.is_uncategorized() {
            "uncategorized".to_string()
        } else {
            escape_html(&task.category)
        };
        let priority = task.priority.map(|p| p.as_str()).unwrap_or("none");

        let _ = writeln!(out, "<section class=\"task\">");
        let _ = writeln!(
            out,
            "<h2>{}{}</h2>",
            if task.completed { "&#10004; " } else { "" },
            escape_html(&task.name)
        );
        let _ = writeln!(out, "<ul class=\"meta\">");
        let _ = writeln!(out, "<li>Deadline: {}</li>", task.deadline.format("%Y-%m-%d"));
        let _ = writeln!(out, "<li>Category: {category}</li>");
        let _ = writeln!(out, "<li>Priority: {priority}</li>");
        let _ = writeln!(out, "<li>Progress: {}%</li>", task.effective_progress());
        let _ = writeln!(out, "</ul>");

        if !task.subtasks.is_empty() {
            let _ = writeln!(out, "<ul class=\"subtasks\">");
            for subtask in &task.subtasks {
                let mark = if subtask.completed { "[x]" } else { "[ ]" };
                let _ = writeln!(out, "<li>{mark} {}</li>", escape_html(&subtask.name));
            }
            let _ = writeln!(out, "</ul>");
        }
        let _ = writeln!(out, "</section>");
    }

    let _ = writeln!(out, "</body></html>");
    out
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{tabular_rows, to_csv, to_html_report};
    use crate::store::TaskStore;
    use crate::task::Priority;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn csv_has_one_row_per_task() {
        let mut store = TaskStore::new();
        store.add_task("Buy milk", date(2026, 1, 2), "Home", Some(Priority::Low), ["a", "b"]);
        store.toggle_subtask(0, 0, true).expect("toggle");

        let csv = to_csv(&tabular_rows(&store));
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "name,deadline,category,priority,progress,completed");
        assert_eq!(lines[1], "Buy milk,2026-01-02,Home,Low,50,false");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn csv_quotes_awkward_cells() {
        let mut store = TaskStore::new();
        store.add_task("Say \"hi\", then leave", date(2026, 1, 2), "", None, Vec::<String>::new());

        let csv = to_csv(&tabular_rows(&store));
        assert!(csv.contains("\"Say \"\"hi\"\", then leave\",2026-01-02,,,0,false"));
    }

    #[test]
    fn report_lists_subtask_markers_and_escapes() {
        let mut store = TaskStore::new();
        store.add_task("<Launch>", date(2026, 1, 2), "", Some(Priority::High), ["build", "ship"]);
        store.toggle_subtask(0, 0, true).expect("toggle");

        let html = to_html_report(&store, "Tasks & more");
        assert!(html.contains("<title>Tasks &amp; more</title>"));
        assert!(html.contains("&lt;Launch&gt;"));
        assert!(html.contains("<li>[x] build</li>"));
        assert!(html.contains("<li>[ ] ship</li>"));
        assert!(html.contains("<li>Progress: 50%</li>"));
        assert!(html.contains("<li>Category: uncategorized</li>"));
    }
}
