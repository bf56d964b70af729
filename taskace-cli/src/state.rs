use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$TASKACE_HOME`, or `~/.taskace`.
pub fn taskace_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("TASKACE_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".taskace"))
}

pub fn ensure_taskace_home() -> Result<PathBuf> {
    let dir = taskace_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// Where per-principal snapshots live unless `[storage] data_dir` says otherwise.
pub fn default_data_dir() -> Result<PathBuf> {
    Ok(taskace_home()?.join("data"))
}
