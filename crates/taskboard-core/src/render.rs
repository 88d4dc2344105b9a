use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::store::TaskView;
use crate::summary::Summary;
use crate::task::Task;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, views, today))]
    pub fn print_task_table(
        &mut self,
        views: &[TaskView<'_>],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_task_table(&mut out, views, today)
    }

    pub fn write_task_table<W: Write>(
        &self,
        out: W,
        views: &[TaskView<'_>],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let headers = vec![
            "#".to_string(),
            "Name".to_string(),
            "Deadline".to_string(),
            "Category".to_string(),
            "Priority".to_string(),
            "Progress".to_string(),
            "Done".to_string(),
        ];

        let mut rows = Vec::with_capacity(views.len());

        for view in views {
            let task = view.task;
            let index = self.paint(&(view.index + 1).to_string(), "33");

            let deadline = task.deadline.format("%Y-%m-%d").to_string();
            let deadline = if !task.completed && task.deadline < today {
                self.paint(&deadline, "31")
            } else {
                deadline
            };

            let priority = task.priority.map(|p| p.to_string()).unwrap_or_default();
            let progress = if task.subtasks.is_empty() {
                format!("{}%", view.progress)
            } else {
                format!(
                    "{}% ({}/{})",
                    view.progress,
                    task.completed_subtasks(),
                    task.subtasks.len()
                )
            };
            let done = if task.completed { "yes" } else { "" }.to_string();

            rows.push(vec![
                index,
                task.name.clone(),
                deadline,
                task.category.clone(),
                priority,
                progress,
                done,
            ]);
        }

        write_table(out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, task))]
    pub fn print_task_info(&mut self, index: usize, task: &Task) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        write_task_info(&mut out, index, task)
    }

    pub fn print_summary(&mut self, summary: &Summary) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "tasks     {}", summary.total)?;
        writeln!(out, "completed {}", summary.completed)?;
        writeln!(out, "progress  {}%", summary.average_progress)?;

        if !summary.by_category.is_empty() {
            writeln!(out)?;
            let rows = summary
                .by_category
                .iter()
                .map(|(name, count)| vec![name.clone(), count.to_string()])
                .collect();
            write_table(&mut out, vec!["Category".to_string(), "Tasks".to_string()], rows)?;
        }

        if !summary.by_priority.is_empty() {
            writeln!(out)?;
            let rows = summary
                .by_priority
                .iter()
                .map(|(name, count)| vec![name.clone(), count.to_string()])
                .collect();
            write_table(&mut out, vec!["Priority".to_string(), "Tasks".to_string()], rows)?;
        }

        Ok(())
    }

    pub fn print_alert(&mut self, task: &Task, today: NaiveDate) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let when = match task.days_until(today) {
            d if d < 0 => format!("overdue by {} day(s)", -d),
            0 => "due today".to_string(),
            1 => "due tomorrow".to_string(),
            d => format!("due in {d} days"),
        };
        let label = self.paint("Deadline:", "31");
        writeln!(out, "{label} {} is {when} ({})", task.name, task.deadline.format("%Y-%m-%d"))?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_task_info<W: Write>(mut out: W, index: usize, task: &Task) -> anyhow::Result<()> {
    writeln!(out, "index     {}", index + 1)?;
    writeln!(out, "id        {}", task.id)?;
    writeln!(out, "name      {}", task.name)?;
    writeln!(out, "deadline  {}", task.deadline.format("%Y-%m-%d"))?;
    writeln!(out, "category  {}", task.category)?;
    writeln!(
        out,
        "priority  {}",
        task.priority.map(|p| p.to_string()).unwrap_or_default()
    )?;
    writeln!(out, "progress  {}%", task.effective_progress())?;
    writeln!(out, "completed {}", if task.completed { "yes" } else { "no" })?;

    for (idx, subtask) in task.subtasks.iter().enumerate() {
        let mark = if subtask.completed { "[x]" } else { "[ ]" };
        writeln!(out, "  {}. {mark} {}", idx + 1, subtask.name)?;
    }

    Ok(())
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
