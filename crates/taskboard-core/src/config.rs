use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tracing::{debug, info, trace, warn};

use crate::alert::DEFAULT_THRESHOLD_DAYS;
use crate::filter::SortKey;

const RC_ENV_VAR: &str = "TASKBOARDRC";
const RC_FILE_NAME: &str = ".taskboardrc";

#[derive(Debug, Clone)]
pub struct Config {
    map: HashMap<String, String>,
    pub loaded_files: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let mut map = HashMap::new();
        map.insert("alert.threshold_days".to_string(), DEFAULT_THRESHOLD_DAYS.to_string());
        map.insert("color".to_string(), "on".to_string());
        map.insert("list.sort".to_string(), "none".to_string());
        Self {
            map,
            loaded_files: vec![],
        }
    }
}

impl Config {
    #[tracing::instrument(skip(rc_override))]
    pub fn load(rc_override: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = Config::default();

        let rc = resolve_rc_path(rc_override)?;
        if let Some(path) = rc {
            info!(rc = %path.display(), "loading taskboardrc");
            cfg.load_file(&path)?;
        } else {
            warn!("no taskboardrc found; using defaults");
        }

        Ok(cfg)
    }

    #[tracing::instrument(skip(self, overrides))]
    pub fn apply_overrides<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (k, v) in overrides {
            let key = k.strip_prefix("rc.").unwrap_or(&k).to_string();
            debug!(key = %key, value = %v, "applying override");
            self.map.insert(key, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn alert_threshold_days(&self) -> anyhow::Result<i64> {
        match self.get("alert.threshold_days") {
            None => Ok(DEFAULT_THRESHOLD_DAYS),
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("invalid alert.threshold_days: {raw}")),
        }
    }

    pub fn default_sort(&self) -> anyhow::Result<SortKey> {
        match self.get("list.sort") {
            None => Ok(SortKey::None),
            Some(raw) => raw
                .parse()
                .map_err(|e| anyhow!("invalid list.sort: {e}")),
        }
    }

    pub fn timezone(&self) -> Option<String> {
        self.get("timezone").filter(|tz| !tz.trim().is_empty())
    }

    #[tracing::instrument(skip(self))]
    fn load_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let path = expand_tilde(path);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        self.loaded_files.push(path.clone());

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        for (line_num, raw_line) in text.lines().enumerate() {
            let mut line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((before, _)) = line.split_once('#') {
                line = before.trim();
            }

            if line.is_empty() {
                continue;
            }

            if let Some(include_rest) = line.strip_prefix("include ") {
                let include_path = resolve_include_path(&base_dir, include_rest.trim())?;
                debug!(
                    file = %path.display(),
                    include = %include_path.display(),
                    line = line_num + 1,
                    "processing include"
                );

                if include_path.exists() {
                    self.load_file(&include_path)?;
                } else {
                    warn!(
                        include = %include_path.display(),
                        "include file does not exist; skipping"
                    );
                }
                continue;
            }

            let (k, v) = line.split_once('=').ok_or_else(|| {
                anyhow!(
                    "invalid config line {}:{}: {}",
                    path.display(),
                    line_num + 1,
                    raw_line
                )
            })?;

            let key = k.trim().to_string();
            let value = v.trim().to_string();
            trace!(key = %key, value = %value, "loaded config key");
            self.map.insert(key, value);
        }

        Ok(())
    }
}

/// Session file location: explicit override, then `data.location`, then the
/// default under the home directory. Creates the parent directory.
#[tracing::instrument(skip(cfg, override_path))]
pub fn resolve_session_file(
    cfg: &Config,
    override_path: Option<&Path>,
) -> anyhow::Result<PathBuf> {
    let file = session_file_path(cfg, override_path)?;

    if let Some(dir) = file.parent()
        && !dir.as_os_str().is_empty()
        && !dir.exists()
    {
        info!(dir = %dir.display(), "creating data directory");
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    Ok(file)
}

fn session_file_path(cfg: &Config, override_path: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(path) = override_path {
        return Ok(path.to_path_buf());
    }
    match cfg.get("data.location").filter(|v| !v.trim().is_empty()) {
        Some(cfg_value) => Ok(expand_tilde(Path::new(&cfg_value))),
        None => default_session_file(),
    }
}

#[tracing::instrument(skip(override_path))]
fn resolve_rc_path(override_path: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = override_path {
        return Ok(Some(path.to_path_buf()));
    }

    if let Ok(rc_env) = std::env::var(RC_ENV_VAR) {
        if rc_env == "/dev/null" {
            return Ok(None);
        }
        return Ok(Some(PathBuf::from(rc_env)));
    }

    let Some(home) = dirs::home_dir() else {
        debug!("no home directory; skipping taskboardrc lookup");
        return Ok(None);
    };
    let candidate = home.join(RC_FILE_NAME);
    if candidate.exists() {
        return Ok(Some(candidate));
    }

    Ok(None)
}

fn default_session_file() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(home.join(".taskboard").join("tasks.json"))
}

fn resolve_include_path(base_dir: &Path, include: &str) -> anyhow::Result<PathBuf> {
    if include.trim().is_empty() {
        return Err(anyhow!("include path cannot be empty"));
    }

    let raw = PathBuf::from(include);
    let expanded = expand_tilde(&raw);
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(base_dir.join(expanded))
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if let Some(rest) = text.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}
