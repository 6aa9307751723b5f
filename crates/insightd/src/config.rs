//! Configuration management for insightd.
//!
//! Loads settings from /etc/insightd/config.toml, then the user config
//! directory, or uses defaults.

use anyhow::{Context, Result};
use insight_common::{ContextPriority, ProgressConfig, ReasoningConfig, TrendThresholds};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// System-wide config file path
pub const CONFIG_PATH: &str = "/etc/insightd/config.toml";

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Minimum spacing between two issued requests, measured from issuance
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Optional controller-imposed request timeout
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Framing when a tick is both critical and degrading
    #[serde(default)]
    pub context_priority: ContextPriority,
}

fn default_cooldown_secs() -> u64 {
    20
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            request_timeout_secs: None,
            context_priority: ContextPriority::default(),
        }
    }
}

impl ControllerConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Daemon front-end configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Draw the status line and thinking bar on the terminal
    #[serde(default = "default_render")]
    pub render: bool,

    /// Ring the terminal bell on each new insight
    #[serde(default)]
    pub bell: bool,
}

fn default_render() -> bool {
    true
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            render: default_render(),
            bell: false,
        }
    }
}

/// Full daemon configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub controller: ControllerConfig,

    #[serde(default)]
    pub progress: ProgressConfig,

    #[serde(default)]
    pub thresholds: TrendThresholds,

    #[serde(default)]
    pub reasoning: ReasoningConfig,

    #[serde(default)]
    pub daemon: DaemonConfig,
}

impl Config {
    /// Load config from the standard locations, or return defaults
    pub fn load() -> Self {
        let mut candidates = vec![PathBuf::from(CONFIG_PATH)];
        if let Some(user) = user_config_path() {
            candidates.push(user);
        }

        for path in &candidates {
            if !path.exists() {
                continue;
            }
            match Self::load_from_path(path) {
                Ok(config) => return config,
                Err(e) => warn!("Ignoring unreadable config {}: {:#}", path.display(), e),
            }
        }

        info!("No config found, using defaults");
        Config::default()
    }

    /// Load config from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Render as TOML (for `--print-config`)
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// `$XDG_CONFIG_HOME/insightd/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("insightd").join("config.toml"))
}
