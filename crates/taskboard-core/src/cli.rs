use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::filter::{PriorityFilter, SortKey, StatusFilter};
use crate::task::Priority;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskboard",
    version,
    about = "Taskboard: deadlines, subtasks and progress from the terminal",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "taskboardrc", global = true)]
    pub taskboardrc: Option<PathBuf>,

    /// Session file holding the task collection.
    #[arg(long = "file", global = true)]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Add a new task.
    Add {
        name: String,
        /// Deadline: YYYY-MM-DD, today, tomorrow, +3d, 2w.
        #[arg(long, short = 'd', default_value = "today")]
        deadline: String,
        #[arg(long, short = 'c', default_value = "")]
        category: String,
        #[arg(long, short = 'p')]
        priority: Option<Priority>,
        /// Subtask name. May be repeated.
        #[arg(long = "subtask", short = 's')]
        subtasks: Vec<String>,
    },

    /// List tasks with their progress.
    List {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, value_enum)]
        sort: Option<SortKey>,
    },

    /// Show one task with its subtasks.
    Show { index: usize },

    /// Mark a task done; all of its subtasks are checked too.
    Done { index: usize },

    /// Clear a task's done flag.
    Reopen { index: usize },

    /// Work with a task's subtasks.
    Subtask {
        #[command(subcommand)]
        action: SubtaskAction,
    },

    /// Delete a task and its subtasks.
    Delete { index: usize },

    /// Delete every completed task.
    ClearCompleted,

    /// Move a task to a new position.
    Move { from: usize, to: usize },

    /// Reorder the whole list by task id.
    Reorder {
        #[arg(required = true)]
        ids: Vec<uuid::Uuid>,
    },

    /// Tasks whose deadline is exactly the given day.
    Due {
        #[arg(default_value = "today")]
        date: String,
    },

    /// Deadline notices for tasks due soon.
    Alerts,

    /// Aggregate progress and counts.
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        json: bool,
    },

    /// Export the collection.
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Write to a file instead of stdout.
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Replace the collection with a JSON export. Use `-` for stdin.
    Import { path: PathBuf },
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubtaskAction {
    Add { index: usize, name: String },
    Check { index: usize, subtask: usize },
    Uncheck { index: usize, subtask: usize },
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct FilterArgs {
    #[arg(long)]
    pub category: Option<String>,
    /// High, Medium, Low or All.
    #[arg(long)]
    pub priority: Option<PriorityFilter>,
    #[arg(long, value_enum)]
    pub status: Option<StatusFilter>,
    /// Case-insensitive substring of the task name.
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
    Html,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls `rc.key=value` / `rc.key:value` tokens out of the argument list.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

/// Converts a 1-based command-line position into a collection index.
pub fn to_index(position: usize) -> anyhow::Result<usize> {
    position
        .checked_sub(1)
        .ok_or_else(|| anyhow!("positions start at 1"))
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use clap::Parser;

    use super::{Command, GlobalCli, preprocess_args, to_index};
    use crate::filter::{PriorityFilter, StatusFilter};
    use crate::task::Priority;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_overrides_are_extracted() {
        let pre = preprocess_args(&os(&[
            "taskboard",
            "rc.color=off",
            "list",
            "rc.list.sort:deadline",
        ]))
        .expect("preprocess");
        assert_eq!(pre.cleaned_args, os(&["taskboard", "list"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.color".to_string(), "off".to_string()),
                ("rc.list.sort".to_string(), "deadline".to_string()),
            ]
        );
    }

    #[test]
    fn add_parses_repeated_subtasks() {
        let cli = GlobalCli::parse_from(os(&[
            "taskboard",
            "add",
            "Paint fence",
            "-d",
            "+2d",
            "-p",
            "high",
            "-s",
            "sand",
            "-s",
            "prime",
        ]));
        match cli.command {
            Some(Command::Add {
                name,
                deadline,
                priority,
                subtasks,
                ..
            }) => {
                assert_eq!(name, "Paint fence");
                assert_eq!(deadline, "+2d");
                assert_eq!(priority, Some(Priority::High));
                assert_eq!(subtasks, vec!["sand", "prime"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn list_filters_parse() {
        let cli = GlobalCli::parse_from(os(&[
            "taskboard", "-vv", "list", "--priority", "all", "--status", "complete",
        ]));
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Command::List { filter, .. }) => {
                assert_eq!(filter.priority, Some(PriorityFilter::All));
                assert_eq!(filter.status, Some(StatusFilter::Complete));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn positions_are_one_based() {
        assert_eq!(to_index(1).expect("index"), 0);
        assert!(to_index(0).is_err());
    }
}
