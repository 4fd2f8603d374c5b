use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::data::loader::Source;
use crate::data::model::Schema;
use crate::data::normalize::DecimalSeparator;
use crate::error::{DashboardError, Result};

/// Looked up in the working directory.
pub const CONFIG_FILE: &str = "dashboard.toml";

/// Source used when the configuration names none.
pub const DEFAULT_SOURCE_PATH: &str = "dados.xlsx";

/// Complete dashboard configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DashboardConfig {
    pub source: SourceConfig,
    pub cache: CacheConfig,
    pub http: HttpConfig,
    /// Column names, after trimming.
    pub columns: Schema,
}

/// Exactly one of `path` / `url`; neither means [`DEFAULT_SOURCE_PATH`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SourceConfig {
    pub path: Option<PathBuf>,
    pub url: Option<String>,
    /// `","` (default, `1.234,56`) or `"."` (`1,234.56`).
    pub decimal_separator: DecimalSeparator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds a loaded table stays valid; 0 keeps it until reload.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 600 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl DashboardConfig {
    /// Load `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            DashboardError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            DashboardError::Config(format!("failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| DashboardError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.path.is_some() && self.source.url.is_some() {
            return Err(DashboardError::Config(
                "[source] takes either `path` or `url`, not both".to_string(),
            ));
        }
        if self.http.timeout_secs == 0 {
            return Err(DashboardError::Config(
                "[http] timeout_secs must be positive".to_string(),
            ));
        }
        if let Some(col) = self.columns.all_columns().iter().find(|c| c.trim().is_empty()) {
            return Err(DashboardError::Config(format!("empty column name {col:?} in [columns]")));
        }
        Ok(())
    }

    pub fn source(&self) -> Source {
        match (&self.source.url, &self.source.path) {
            (Some(url), _) => Source::Url(url.clone()),
            (None, Some(path)) => Source::File(path.clone()),
            (None, None) => Source::File(PathBuf::from(DEFAULT_SOURCE_PATH)),
        }
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache.ttl_secs > 0).then(|| Duration::from_secs(self.cache.ttl_secs))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }
}
