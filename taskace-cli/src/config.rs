use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use taskace_core::time::parse_timezone;

use crate::state::{default_data_dir, ensure_taskace_home};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub profile: ProfileSection,
    #[serde(default)]
    pub storage: StorageSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSection {
    /// Identity the task pool is stored under.
    pub principal: String,
    /// IANA zone used for "today" and for entering deadlines.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSection {
    /// Empty means `<taskace home>/data`.
    #[serde(default)]
    pub data_dir: String,
}

fn default_timezone() -> String {
    "America/Chicago".to_string()
}

impl Default for ProfileSection {
    fn default() -> Self {
        Self {
            principal: "default".to_string(),
            timezone: default_timezone(),
        }
    }
}

impl Config {
    pub fn timezone(&self) -> Result<Tz> {
        parse_timezone(&self.profile.timezone)
            .with_context(|| format!("[profile] timezone = {:?}", self.profile.timezone))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        let dir = self.storage.data_dir.trim();
        if dir.is_empty() {
            default_data_dir()
        } else {
            Ok(PathBuf::from(dir))
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_taskace_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).context("parse config.toml")
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}
