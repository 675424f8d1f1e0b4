//! Host configuration: the function table and the simulation window.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tickq_core::{Error, Result};
use tickq_timers::TimerQueueConfig;

/// Configuration for the `tickq` host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// First tick simulated by `run`.
    #[serde(default)]
    pub start_tick: i64,

    /// Number of ticks simulated by `run`.
    #[serde(default = "default_ticks")]
    pub ticks: u64,

    /// Save file holding the pending events.
    #[serde(default = "default_save_path")]
    pub save_path: PathBuf,

    /// Tracing filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Timer queue settings.
    #[serde(default)]
    pub queue: TimerQueueConfig,

    /// Functions callbacks can run, by name.
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionDef>,

    /// Function tags: tag name to member function names.
    #[serde(default)]
    pub tags: BTreeMap<String, Vec<String>>,
}

/// A function the host can run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDef {
    /// Lines emitted when the function runs.
    #[serde(default)]
    pub output: Vec<String>,

    /// Re-schedule the function this many ticks after each run.
    #[serde(default)]
    pub repeat_every: Option<i64>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            start_tick: 0,
            ticks: default_ticks(),
            save_path: default_save_path(),
            log_filter: default_log_filter(),
            queue: TimerQueueConfig::default(),
            functions: BTreeMap::new(),
            tags: BTreeMap::new(),
        }
    }
}

impl HostConfig {
    /// Load configuration from a file.
    ///
    /// `.json` files are parsed as JSON, everything else as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or fails
    /// [`validate`](Self::validate).
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::file_read_failed(path, e.to_string()))?;

        let config: Self = if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content).map_err(|e| Error::json_parse_failed(e.to_string()))?
        } else {
            toml::from_str(&content).map_err(|e| Error::toml_parse_failed(e.to_string()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigInvalid`] when a repeat interval is not
    /// positive or a tag names an unknown function.
    pub fn validate(&self) -> Result<()> {
        if let Some((name, _)) = self
            .functions
            .iter()
            .find(|(_, def)| def.repeat_every.is_some_and(|every| every <= 0))
        {
            return Err(Error::config_invalid(format!(
                "function '{name}' must repeat after a positive number of ticks"
            )));
        }

        for (tag, members) in &self.tags {
            if let Some(missing) = members.iter().find(|m| !self.functions.contains_key(*m)) {
                return Err(Error::config_invalid(format!(
                    "tag '{tag}' references unknown function '{missing}'"
                )));
            }
        }

        Ok(())
    }
}

const fn default_ticks() -> u64 {
    20
}

fn default_save_path() -> PathBuf {
    PathBuf::from("tickq-save.json")
}

fn default_log_filter() -> String {
    "info".to_string()
}
