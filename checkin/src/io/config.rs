//! Check-in configuration stored under `.checkin/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::schedule::DEFAULT_DUE_WINDOW_MINUTES;
use crate::core::types::Arm;

/// Check-in configuration (TOML).
///
/// Missing fields default to the values the app ships with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CheckinConfig {
    /// Arm to use when the host does not supply one.
    pub arm: Arm,

    /// Minutes before the scheduled check-in time at which the flow opens.
    pub due_window_minutes: i64,

    /// File name of the durable store inside `.checkin/`.
    pub store_file: String,
}

impl Default for CheckinConfig {
    fn default() -> Self {
        Self {
            arm: Arm::Control,
            due_window_minutes: DEFAULT_DUE_WINDOW_MINUTES,
            store_file: "state.json".to_string(),
        }
    }
}

impl CheckinConfig {
    pub fn validate(&self) -> Result<()> {
        if self.due_window_minutes < 0 {
            return Err(anyhow!("due_window_minutes must be >= 0"));
        }
        let name = self.store_file.trim();
        if name.is_empty() {
            return Err(anyhow!("store_file must be a non-empty file name"));
        }
        if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
            return Err(anyhow!("store_file must be a plain file name, got `{name}`"));
        }
        Ok(())
    }

    pub fn due_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.due_window_minutes)
    }
}

/// All canonical paths within `.checkin/` for a root directory.
#[derive(Debug, Clone)]
pub struct CheckinPaths {
    pub root: PathBuf,
    pub checkin_dir: PathBuf,
    pub config_path: PathBuf,
}

impl CheckinPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let checkin_dir = root.join(".checkin");
        Self {
            config_path: checkin_dir.join("config.toml"),
            checkin_dir,
            root,
        }
    }

    pub fn store_path(&self, cfg: &CheckinConfig) -> PathBuf {
        self.checkin_dir.join(cfg.store_file.trim())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `CheckinConfig::default()`.
pub fn load_config(path: &Path) -> Result<CheckinConfig> {
    if !path.exists() {
        let cfg = CheckinConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: CheckinConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &CheckinConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
