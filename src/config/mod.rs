//! Configuration module for topoguard
//!
//! This module handles:
//! - Project-level configuration (topoguard.toml)
//! - Calibration policy and store retention caps
//! - Security audit rule overrides

mod project_config;

pub use project_config::{
    load_project_config, AuditConfig, ProjectConfig, RetentionConfig, StoreBackend, StoreConfig,
    CONFIG_FILE_NAME, EXAMPLE_CONFIG,
};
