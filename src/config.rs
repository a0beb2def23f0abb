use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::LayoutConfig;
use crate::theme::Theme;

const MAX_COMMITS_DEFAULT: usize = 500;
const MAX_BRANCHES_DEFAULT: usize = 20;
const AUTHOR_SCAN_MINIMUM: usize = 1000;
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file '{path}'")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which commits a reload should fetch.
///
/// Immutable once built; a reload with different filters takes a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterConfig {
    pub branch: Option<String>,
    pub tag: Option<String>,
    pub author: Option<String>,
    /// Case-insensitive substring of the full commit message.
    pub message: Option<String>,
    pub max_commits: usize,
    pub max_branches: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            branch: None,
            tag: None,
            author: None,
            message: None,
            max_commits: std::env::var("GITLANES_MAX_COMMITS")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(MAX_COMMITS_DEFAULT),
            max_branches: std::env::var("GITLANES_MAX_BRANCHES")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(MAX_BRANCHES_DEFAULT),
        }
    }
}

impl FilterConfig {
    /// Trims every text filter and drops the blank ones.
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.branch,
            &mut self.tag,
            &mut self.author,
            &mut self.message,
        ] {
            *field = field
                .take()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty());
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_commits == 0 {
            return Err(ConfigError::Invalid(
                "maxCommits must be at least 1".to_string(),
            ));
        }
        if self.max_branches == 0 {
            return Err(ConfigError::Invalid(
                "maxBranches must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of commits scanned when collecting author names.
    pub fn author_scan_limit(&self) -> usize {
        self.max_commits.max(AUTHOR_SCAN_MINIMUM)
    }

    /// Suffix listing the active filters, e.g. ` • branch="main"`.
    pub fn describe(&self) -> String {
        let mut parts = String::new();
        let labelled = [
            ("branch=", &self.branch),
            ("tag=", &self.tag),
            ("author=", &self.author),
            ("message~=", &self.message),
        ];
        for (label, value) in labelled {
            if let Some(value) = value {
                parts.push_str(&format!(" \u{2022} {label}\"{value}\""));
            }
        }
        parts
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub layout: LayoutConfig,
    pub filters: FilterConfig,
    pub theme: Theme,
    /// Overrides the theme's canvas background in exports.
    pub background: Option<String>,
}

impl AppConfig {
    /// Loads `explicit` when given, otherwise the per-user config file.
    ///
    /// A missing per-user file yields defaults; a missing explicit file is
    /// an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents, path)
    }

    fn from_json(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut config: AppConfig =
            serde_json::from_str(contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.filters = config.filters.normalized();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.filters.validate()?;
        let layout = &self.layout;
        if layout.min_scale <= 0.0 || layout.min_scale > layout.max_scale {
            return Err(ConfigError::Invalid(format!(
                "scale range {}..{} is empty or not positive",
                layout.min_scale, layout.max_scale
            )));
        }
        if layout.column_gap <= 0.0 || layout.row_gap <= 0.0 {
            return Err(ConfigError::Invalid(
                "columnGap and rowGap must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// `<config_dir>/gitlanes/config.json` for the current user.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "gitlanes").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
