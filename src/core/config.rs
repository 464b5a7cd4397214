//! Layered configuration
//!
//! Layers, later ones winning: built-in defaults, the user config file
//! (`<config dir>/qat/config.yaml`), the project file `.qat/config.yaml`,
//! then `QAT_*` environment variables.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::core::tolerance::ToleranceSpec;
use crate::entities::test_table::TestKind;

/// Directory holding project-level settings
pub const PROJECT_DIR: &str = ".qat";

/// Decimal places used when nothing else is configured
pub const DEFAULT_DECIMALS: usize = 2;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Default tester name for new reports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tester: Option<String>,

    /// Institution printed on report headers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,

    /// Decimal places for displayed statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<usize>,

    /// Tolerance overrides per test type
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tolerances: BTreeMap<TestKind, ToleranceSpec>,
}

impl Config {
    /// Load all layers for a project rooted at `project_root`
    pub fn load(project_root: &Path) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(global) = Self::global_path() {
            if global.exists() {
                config.merge(Self::load_file(&global)?);
            }
        }

        let local = Self::project_path(project_root);
        if local.exists() {
            config.merge(Self::load_file(&local)?);
        }

        config.apply_env()?;
        Ok(config)
    }

    /// Path of the user-level config file, if the platform has one
    pub fn global_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "qat").map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    pub fn project_path(project_root: &Path) -> PathBuf {
        project_root.join(PROJECT_DIR).join("config.yaml")
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loading config layer");
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Overlay `other` on top of `self`
    pub fn merge(&mut self, other: Config) {
        if other.tester.is_some() {
            self.tester = other.tester;
        }
        if other.institution.is_some() {
            self.institution = other.institution;
        }
        if other.decimals.is_some() {
            self.decimals = other.decimals;
        }
        self.tolerances.extend(other.tolerances);
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(value) = std::env::var("QAT_DECIMALS") {
            let decimals = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: "QAT_DECIMALS",
                value: value.clone(),
            })?;
            self.decimals = Some(decimals);
        }
        if let Ok(tester) = std::env::var("QAT_TESTER") {
            if !tester.trim().is_empty() {
                self.tester = Some(tester);
            }
        }
        Ok(())
    }

    pub fn decimals(&self) -> usize {
        self.decimals.unwrap_or(DEFAULT_DECIMALS)
    }

    /// Tolerance for a test type: configured override, else the built-in
    /// default. `None` means the test type has no default and nothing was
    /// configured.
    pub fn tolerance_for(&self, kind: TestKind) -> Option<ToleranceSpec> {
        self.tolerances
            .get(&kind)
            .cloned()
            .or_else(|| kind.default_tolerance())
    }

    /// Starter file written by `qat init`
    pub fn template() -> String {
        let mut config = Config {
            decimals: Some(DEFAULT_DECIMALS),
            ..Config::default()
        };
        for kind in TestKind::all() {
            if let Some(spec) = kind.default_tolerance() {
                config.tolerances.insert(*kind, spec);
            }
        }
        let body = serde_yml::to_string(&config).unwrap_or_default();
        format!(
            "# QA tolerance toolkit configuration\n\
             # Tolerances here override the built-in AERB defaults.\n\
             # tester: \"Your Name\"\n\
             # institution: \"Hospital name\"\n{}",
            body
        )
    }
}
