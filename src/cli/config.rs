use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context as _, Result};
use serde::Deserialize;

use crate::adapter::capabilities::IntegrationCapabilities;

/// Name of the config file picked up from the working directory.
pub const CONFIG_FILE: &str = "guideflow.yaml";

/// Configuration loaded from `guideflow.yaml`.
/// All fields are optional; missing fields fall back to CLI/env/defaults.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct GuideflowConfig {
    pub workflows_dir: Option<String>,
    pub agents_dir: Option<String>,
    pub project_dir: Option<String>,
    pub integration: Option<String>,
    pub interactive: Option<bool>,
    /// Integration id → capabilities, added to or replacing the built-in table.
    pub integrations: Option<HashMap<String, IntegrationCapabilities>>,
}

impl GuideflowConfig {
    /// Load configuration from a YAML file.
    ///
    /// - If `path` is `Some`, load that specific file (error if missing).
    /// - If `path` is `None`, auto-detect `guideflow.yaml` in cwd; return defaults if absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file_path = match path {
            Some(p) => {
                if !p.exists() {
                    anyhow::bail!("Config file not found: {}", p.display());
                }
                p.to_path_buf()
            }
            None => {
                let default_path = Path::new(CONFIG_FILE);
                if !default_path.exists() {
                    return Ok(Self::default());
                }
                default_path.to_path_buf()
            }
        };

        let contents = std::fs::read_to_string(&file_path)
            .with_context(|| format!("Failed to read config file: {}", file_path.display()))?;

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: GuideflowConfig = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", file_path.display()))?;

        Ok(config)
    }
}
