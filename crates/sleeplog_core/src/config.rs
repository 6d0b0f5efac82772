//! Runtime configuration for the sleep log core.
//!
//! # Responsibility
//! - Locate the database and log directory.
//! - Carry chart scaling constants shared by every front end.
//!
//! # Invariants
//! - A missing config file yields defaults, not an error.
//! - Environment overrides are applied after the file is read.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use crate::chart::series::MetricKind;
use crate::logging::default_log_level;

const APP_DIR_NAME: &str = "sleeplog";
const DB_FILE_NAME: &str = "sleeplog.sqlite3";

pub const ENV_DB_PATH: &str = "SLEEPLOG_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "SLEEPLOG_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "SLEEPLOG_LOG_DIR";

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid config `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

/// Chart scaling and display settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Floor for the duration chart denominator, in seconds.
    pub duration_minimum_scale_secs: f64,
    /// Floor for the score chart denominator.
    pub score_minimum_scale: f64,
    /// Suffix appended to score labels.
    pub score_unit: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            duration_minimum_scale_secs: 3600.0,
            score_minimum_scale: 1.0,
            score_unit: "pts".to_string(),
        }
    }
}

impl ChartConfig {
    pub fn score_kind(&self) -> MetricKind {
        MetricKind::Score {
            unit: self.score_unit.clone(),
        }
    }
}

/// Top-level core configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    /// Absolute directory for rolling logs; `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
    pub chart: ChartConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::for_data_dir(default_data_dir())
    }
}

impl CoreConfig {
    /// Defaults rooted at `data_dir`.
    ///
    /// Without an absolute data dir the database lives under the working
    /// directory and file logging stays off, since log dirs must be absolute.
    pub fn for_data_dir(data_dir: Option<PathBuf>) -> Self {
        let (db_path, log_dir) = match data_dir.filter(|dir| dir.is_absolute()) {
            Some(dir) => (dir.join(DB_FILE_NAME), Some(dir.join("logs"))),
            None => (Path::new(APP_DIR_NAME).join(DB_FILE_NAME), None),
        };
        Self {
            db_path,
            log_dir,
            log_level: default_log_level().to_string(),
            chart: ChartConfig::default(),
        }
    }

    /// Reads `path` (JSON) if it exists, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies overrides from a variable lookup. Blank values are skipped.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(db_path) = read(ENV_DB_PATH) {
            self.db_path = PathBuf::from(db_path);
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(log_dir) = read(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(log_dir));
        }
    }
}

/// Platform data directory for the app, if the platform has one.
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join(APP_DIR_NAME))
}
