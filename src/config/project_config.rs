//! Project-level configuration support
//!
//! Loads per-project configuration from `topoguard.toml` or
//! `.topoguardrc.json` in the working directory.
//!
//! # Configuration Format
//!
//! ```toml
//! # topoguard.toml
//!
//! [calibration]
//! min_samples = 5
//! ignore_threshold = 0.6
//! strong_ignore_threshold = 0.85
//! fix_threshold = 0.5
//! critical_min_severity = "high"
//!
//! [retention]
//! feedback_cap = 1000
//! usage_cap = 2000
//! interaction_cap = 5000
//!
//! [store]
//! backend = "auto"
//!
//! [audit]
//! disabled_rules = ["NET-007"]
//! severity_overrides = { "MON-001" = "low" }
//! ```

use crate::calibrate::CalibrationConfig;
use crate::models::Severity;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the preferred config file
pub const CONFIG_FILE_NAME: &str = "topoguard.toml";
const JSON_CONFIG_FILE_NAME: &str = ".topoguardrc.json";

/// Project configuration loaded from topoguard.toml
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    /// Severity calibration policy
    #[serde(default)]
    pub calibration: CalibrationConfig,

    /// Per-store retention caps
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Learning store backend selection
    #[serde(default)]
    pub store: StoreConfig,

    /// Security audit rule overrides
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Soft caps applied after every store write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_feedback_cap")]
    pub feedback_cap: usize,
    #[serde(default = "default_usage_cap")]
    pub usage_cap: usize,
    #[serde(default = "default_interaction_cap")]
    pub interaction_cap: usize,
}

fn default_feedback_cap() -> usize {
    1000
}

fn default_usage_cap() -> usize {
    2000
}

fn default_interaction_cap() -> usize {
    5000
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            feedback_cap: default_feedback_cap(),
            usage_cap: default_usage_cap(),
            interaction_cap: default_interaction_cap(),
        }
    }
}

/// Which record backend the learning stores use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Try the persistent database, fall back to memory
    #[default]
    Auto,
    /// Persistent database only; opening failure is an error
    Persistent,
    /// Process-local, nothing survives exit
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(StoreBackend::Auto),
            "persistent" => Ok(StoreBackend::Persistent),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!(
                "Unknown store backend '{}'. Valid: auto, persistent, memory",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Database file; defaults to `<data_dir>/topoguard/learning.redb`
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// Resolved database path
    pub fn db_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("topoguard")
            .join("learning.redb")
    }
}

/// Per-rule overrides for the security audit
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Rule ids to skip entirely
    #[serde(default)]
    pub disabled_rules: Vec<String>,

    /// Rule id to replacement severity
    #[serde(default)]
    pub severity_overrides: HashMap<String, Severity>,
}

impl AuditConfig {
    pub fn is_rule_enabled(&self, rule_id: &str) -> bool {
        !self
            .disabled_rules
            .iter()
            .any(|r| r.eq_ignore_ascii_case(rule_id))
    }

    pub fn severity_override(&self, rule_id: &str) -> Option<Severity> {
        self.severity_overrides
            .iter()
            .find(|(id, _)| id.eq_ignore_ascii_case(rule_id))
            .map(|(_, sev)| *sev)
    }
}

/// Load project configuration from `dir`
///
/// Tries `topoguard.toml` first, then `.topoguardrc.json`. A file that fails
/// to parse is skipped with a warning; with no usable file the defaults are
/// returned.
pub fn load_project_config(dir: &Path) -> ProjectConfig {
    let toml_path = dir.join(CONFIG_FILE_NAME);
    if toml_path.exists() {
        match load_toml_config(&toml_path) {
            Ok(config) => {
                debug!("Loaded project config from {}", toml_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", toml_path.display(), e);
            }
        }
    }

    let json_path = dir.join(JSON_CONFIG_FILE_NAME);
    if json_path.exists() {
        match load_json_config(&json_path) {
            Ok(config) => {
                debug!("Loaded project config from {}", json_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", json_path.display(), e);
            }
        }
    }

    debug!("No project config found, using defaults");
    ProjectConfig::default()
}

fn load_toml_config(path: &Path) -> anyhow::Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ProjectConfig = toml::from_str(&content)?;
    Ok(config)
}

fn load_json_config(path: &Path) -> anyhow::Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ProjectConfig = serde_json::from_str(&content)?;
    Ok(config)
}

/// Example file written by `topoguard init`
pub const EXAMPLE_CONFIG: &str = r#"# topoguard configuration

[calibration]
# Interactions needed before a finding's severity is recalibrated
min_samples = 5
# Ignore rate above which severity drops one step
ignore_threshold = 0.6
# Ignore rate above which severity drops two steps
strong_ignore_threshold = 0.85
# Fix rate at or above which the original severity is kept
fix_threshold = 0.5
# Critical findings never drop below this
critical_min_severity = "high"

[retention]
feedback_cap = 1000
usage_cap = 2000
interaction_cap = 5000

[store]
# auto | persistent | memory
backend = "auto"
# path = "/custom/learning.redb"

[audit]
disabled_rules = []
# severity_overrides = { "MON-001" = "low" }
"#;
