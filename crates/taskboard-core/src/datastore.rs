use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::interchange::{self, TaskRecord};
use crate::store::TaskStore;
use crate::task::TaskId;

/// The JSON interchange file a CLI session is loaded from and saved back to,
/// plus a sibling file recording which tasks already raised a deadline alert.
#[derive(Debug)]
pub struct SessionFile {
    pub path: PathBuf,
    pub alerts_path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let alerts_path = path.with_extension("alerts.json");
        Self { path, alerts_path }
    }

    /// A missing or blank file is an empty collection.
    #[tracing::instrument(skip(self), fields(file = %self.path.display()))]
    pub fn load(&self) -> anyhow::Result<TaskStore> {
        if !self.path.exists() {
            info!("session file not found; starting empty");
            return Ok(TaskStore::new());
        }

        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading {}", self.path.display()))?;
        if text.trim().is_empty() {
            return Ok(TaskStore::new());
        }

        let records = interchange::from_json_str(&text)
            .with_context(|| format!("failed parsing {}", self.path.display()))?;
        let mut store = TaskStore::new();
        store
            .import(records)
            .with_context(|| format!("invalid task data in {}", self.path.display()))?;

        debug!(count = store.len(), "loaded session");
        Ok(store)
    }

    #[tracing::instrument(
        skip(self, store),
        fields(file = %self.path.display(), count = store.len())
    )]
    pub fn save(&self, store: &TaskStore) -> anyhow::Result<()> {
        let json = interchange::to_json_string(&store.export())?;
        write_atomic(&self.path, &json).context("failed to save session file")
    }

    /// Ids that already alerted. A missing or blank file means none.
    #[tracing::instrument(skip(self), fields(file = %self.alerts_path.display()))]
    pub fn load_alerted(&self) -> anyhow::Result<Vec<TaskId>> {
        if !self.alerts_path.exists() {
            return Ok(vec![]);
        }

        let text = fs::read_to_string(&self.alerts_path)
            .with_context(|| format!("failed reading {}", self.alerts_path.display()))?;
        if text.trim().is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<TaskId> = serde_json::from_str(&text)
            .with_context(|| format!("failed parsing {}", self.alerts_path.display()))?;
        debug!(count = ids.len(), "loaded alert record");
        Ok(ids)
    }

    #[tracing::instrument(
        skip(self, ids),
        fields(file = %self.alerts_path.display(), count = ids.len())
    )]
    pub fn save_alerted(&self, ids: &[TaskId]) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(ids)?;
        write_atomic(&self.alerts_path, &json).context("failed to save alert record")
    }
}

#[tracing::instrument(skip(path))]
pub fn read_records(path: &Path) -> anyhow::Result<Vec<TaskRecord>> {
    debug!(file = %path.display(), "reading interchange records");
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    let records = interchange::from_json_str(&text)
        .with_context(|| format!("failed parsing {}", path.display()))?;
    Ok(records)
}

#[tracing::instrument(skip(path, contents))]
pub fn write_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
    debug!(file = %path.display(), bytes = contents.len(), "writing file atomically");

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents.as_bytes())?;
    if !contents.ends_with('\n') {
        writeln!(temp)?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
