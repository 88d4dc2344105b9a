use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::alert::AlertTracker;
use crate::cli::{Command, ExportFormat, FilterArgs, SubtaskAction, to_index};
use crate::config::Config;
use crate::datastore;
use crate::datetime::parse_deadline;
use crate::filter::{SortKey, TaskQuery};
use crate::interchange;
use crate::render::Renderer;
use crate::store::TaskStore;
use crate::summary::Summary;
use crate::tabular;
use crate::task::Priority;

/// Everything one command invocation works against.
pub struct Session<'a> {
    pub store: &'a mut TaskStore,
    pub alerts: AlertTracker,
    pub cfg: &'a Config,
    pub renderer: &'a mut Renderer,
    pub today: NaiveDate,
}

/// Runs one command. Returns whether the collection changed and needs saving.
#[instrument(skip(session, command))]
pub fn dispatch(session: &mut Session<'_>, command: Command) -> anyhow::Result<bool> {
    debug!(?command, today = %session.today, "dispatching command");

    match command {
        Command::Add {
            name,
            deadline,
            category,
            priority,
            subtasks,
        } => cmd_add(session, &name, &deadline, &category, priority, &subtasks),
        Command::List { filter, sort } => cmd_list(session, &filter, sort),
        Command::Show { index } => cmd_show(session, index),
        Command::Done { index } => cmd_done(session, index),
        Command::Reopen { index } => cmd_reopen(session, index),
        Command::Subtask { action } => cmd_subtask(session, action),
        Command::Delete { index } => cmd_delete(session, index),
        Command::ClearCompleted => cmd_clear_completed(session),
        Command::Move { from, to } => cmd_move(session, from, to),
        Command::Reorder { ids } => cmd_reorder(session, &ids),
        Command::Due { date } => cmd_due(session, &date),
        Command::Alerts => cmd_alerts(session),
        Command::Summary { filter, json } => cmd_summary(session, &filter, json),
        Command::Export { format, output } => cmd_export(session, format, output.as_deref()),
        Command::Import { path } => cmd_import(session, &path),
    }
}

pub fn build_query(filter: &FilterArgs) -> TaskQuery {
    TaskQuery {
        category: filter.category.clone(),
        priority: filter.priority.unwrap_or_default(),
        status: filter.status.unwrap_or_default(),
        text: filter.search.clone(),
    }
}

#[instrument(skip(session, subtasks))]
fn cmd_add(
    session: &mut Session<'_>,
    name: &str,
    deadline: &str,
    category: &str,
    priority: Option<Priority>,
    subtasks: &[String],
) -> anyhow::Result<bool> {
    info!("command add");

    let deadline = parse_deadline(deadline, session.today)?;
    let Some(task) = session
        .store
        .add_task(name, deadline, category, priority, subtasks)
    else {
        warn!("task name was blank; nothing added");
        return Ok(false);
    };

    let created = task.name.clone();
    println!("Created task {} ({created}).", session.store.len());
    Ok(true)
}

#[instrument(skip(session, filter))]
fn cmd_list(
    session: &mut Session<'_>,
    filter: &FilterArgs,
    sort: Option<SortKey>,
) -> anyhow::Result<bool> {
    info!("command list");

    let sort = match sort {
        Some(sort) => sort,
        None => session.cfg.default_sort()?,
    };
    let query = build_query(filter);
    let views = session.store.sorted_query(&query, sort);

    if views.is_empty() {
        println!("No matching tasks.");
        return Ok(false);
    }

    session.renderer.print_task_table(&views, session.today)?;

    let today = session.today;
    let due = session.alerts.collect(views.iter().map(|v| v.task), today);
    for task in due {
        session.renderer.print_alert(task, today)?;
    }

    Ok(false)
}

#[instrument(skip(session))]
fn cmd_show(session: &mut Session<'_>, position: usize) -> anyhow::Result<bool> {
    let index = to_index(position)?;
    let task = session.store.get(index)?;
    session.renderer.print_task_info(index, task)?;
    Ok(false)
}

#[instrument(skip(session))]
fn cmd_done(session: &mut Session<'_>, position: usize) -> anyhow::Result<bool> {
    info!("command done");
    let index = to_index(position)?;
    session.store.complete_task(index)?;
    println!("Completed task {position}.");
    Ok(true)
}

#[instrument(skip(session))]
fn cmd_reopen(session: &mut Session<'_>, position: usize) -> anyhow::Result<bool> {
    info!("command reopen");
    let index = to_index(position)?;
    session.store.reopen_task(index)?;
    println!("Reopened task {position}.");
    Ok(true)
}

#[instrument(skip(session))]
fn cmd_subtask(session: &mut Session<'_>, action: SubtaskAction) -> anyhow::Result<bool> {
    info!("command subtask");
    match action {
        SubtaskAction::Add { index, name } => {
            let added = session.store.add_subtask(to_index(index)?, &name)?;
            if !added {
                warn!("subtask name was blank; nothing added");
            }
            Ok(added)
        }
        SubtaskAction::Check { index, subtask } => {
            session
                .store
                .toggle_subtask(to_index(index)?, to_index(subtask)?, true)?;
            Ok(true)
        }
        SubtaskAction::Uncheck { index, subtask } => {
            session
                .store
                .toggle_subtask(to_index(index)?, to_index(subtask)?, false)?;
            Ok(true)
        }
    }
}

#[instrument(skip(session))]
fn cmd_delete(session: &mut Session<'_>, position: usize) -> anyhow::Result<bool> {
    info!("command delete");
    let removed = session.store.delete_task(to_index(position)?)?;
    println!("Deleted task {position} ({}).", removed.name);
    Ok(true)
}

#[instrument(skip(session))]
fn cmd_clear_completed(session: &mut Session<'_>) -> anyhow::Result<bool> {
    info!("command clear-completed");
    let removed = session.store.delete_where(|task| task.completed);
    println!("Removed {removed} completed task(s).");
    Ok(removed > 0)
}

#[instrument(skip(session))]
fn cmd_move(session: &mut Session<'_>, from: usize, to: usize) -> anyhow::Result<bool> {
    info!("command move");
    session.store.move_task(to_index(from)?, to_index(to)?)?;
    Ok(true)
}

#[instrument(skip(session, ids))]
fn cmd_reorder(session: &mut Session<'_>, ids: &[uuid::Uuid]) -> anyhow::Result<bool> {
    info!("command reorder");
    session.store.reorder(ids)?;
    Ok(true)
}

#[instrument(skip(session))]
fn cmd_due(session: &mut Session<'_>, date: &str) -> anyhow::Result<bool> {
    info!("command due");
    let date = parse_deadline(date, session.today)?;
    let due = session.store.tasks_due_on(date);
    if due.is_empty() {
        println!("Nothing due on {}.", date.format("%Y-%m-%d"));
        return Ok(false);
    }
    for task in due {
        println!("{} ({}%)", task.name, task.effective_progress());
    }
    Ok(false)
}

#[instrument(skip(session))]
fn cmd_alerts(session: &mut Session<'_>) -> anyhow::Result<bool> {
    info!("command alerts");
    let today = session.today;
    let due = session.alerts.collect(session.store.tasks(), today);
    if due.is_empty() {
        println!("No deadlines within {} day(s).", session.alerts.threshold_days());
    }
    for task in due {
        session.renderer.print_alert(task, today)?;
    }
    Ok(false)
}

#[instrument(skip(session, filter))]
fn cmd_summary(session: &mut Session<'_>, filter: &FilterArgs, json: bool) -> anyhow::Result<bool> {
    info!("command summary");
    let views = session.store.query(&build_query(filter));
    let summary = Summary::from_views(&views);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        session.renderer.print_summary(&summary)?;
    }
    Ok(false)
}

#[instrument(skip(session))]
fn cmd_export(
    session: &mut Session<'_>,
    format: ExportFormat,
    output: Option<&Path>,
) -> anyhow::Result<bool> {
    info!("command export");

    let body = match format {
        ExportFormat::Json => interchange::to_json_string(&session.store.export())?,
        ExportFormat::Csv => tabular::to_csv(&tabular::tabular_rows(session.store)),
        ExportFormat::Html => tabular::to_html_report(session.store, "Tasks"),
    };

    match output {
        Some(path) => {
            datastore::write_atomic(path, &body)
                .with_context(|| format!("failed to export to {}", path.display()))?;
            println!("Exported {} task(s) to {}.", session.store.len(), path.display());
        }
        None => println!("{}", body.trim_end()),
    }
    Ok(false)
}

#[instrument(skip(session))]
fn cmd_import(session: &mut Session<'_>, path: &Path) -> anyhow::Result<bool> {
    info!("command import");

    let records = if path == Path::new("-") {
        let mut stdin = String::new();
        io::stdin()
            .read_to_string(&mut stdin)
            .context("failed reading stdin")?;
        interchange::from_json_str(&stdin)?
    } else {
        datastore::read_records(path)?
    };

    let count = records.len();
    session
        .store
        .import(records)
        .map_err(|err| anyhow!("import rejected, existing tasks kept: {err}"))?;

    println!("Imported {count} task(s).");
    Ok(true)
}
