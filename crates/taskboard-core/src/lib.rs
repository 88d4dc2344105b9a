pub mod alert;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod datetime;
pub mod error;
pub mod filter;
pub mod interchange;
pub mod render;
pub mod store;
pub mod summary;
pub mod tabular;
pub mod task;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

pub use error::StoreError;
pub use store::TaskStore;

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let pre = cli::preprocess_args(&raw_args)?;
    let cli = cli::GlobalCli::parse_from(pre.cleaned_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        "starting taskboard"
    );
    debug!(?pre.rc_overrides, "preprocessed rc overrides");

    let mut cfg = config::Config::load(cli.taskboardrc.as_deref())?;
    cfg.apply_overrides(
        pre.rc_overrides
            .into_iter()
            .chain(cli.rc_overrides.into_iter().map(|kv| (kv.key, kv.value))),
    );

    let session_path = config::resolve_session_file(&cfg, cli.file.as_deref())
        .context("failed to resolve session file")?;
    let session_file = datastore::SessionFile::new(session_path);
    let mut store = session_file.load().with_context(|| {
        format!(
            "failed to load tasks from {}",
            session_file.path.display()
        )
    })?;

    let today = datetime::today_in(cfg.timezone().as_deref())?;
    let mut renderer = render::Renderer::new(&cfg)?;
    let alerted = session_file.load_alerted().with_context(|| {
        format!(
            "failed to load alert record from {}",
            session_file.alerts_path.display()
        )
    })?;
    let alerts = alert::AlertTracker::with_alerted(cfg.alert_threshold_days()?, alerted);

    let command = cli.command.unwrap_or(cli::Command::List {
        filter: cli::FilterArgs::default(),
        sort: None,
    });

    let mut session = commands::Session {
        store: &mut store,
        alerts,
        cfg: &cfg,
        renderer: &mut renderer,
        today,
    };
    let changed = commands::dispatch(&mut session, command)?;
    let commands::Session { mut alerts, .. } = session;

    if changed {
        session_file.save(&store)?;
    }

    alerts.retain_known(store.tasks());
    if alerts.is_dirty() {
        session_file.save_alerted(&alerts.alerted_ids())?;
    }

    info!(changed, "done");
    Ok(())
}
