//! TOML pipeline configuration.
//!
//! Every table and field is optional; missing values take the defaults of
//! the underlying parameter structs. `validate()` is the single gate between
//! a loaded file and the batch: nothing runs on an invalid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use regimelab_core::params::{
    EvalParams, FeatureParams, LabelParams, ParamError, PipelineParams, RegimeParams,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to fingerprint config: {0}")]
    Fingerprint(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] ParamError),

    #[error("selection.recency_days must be >= 0 (got {0})")]
    Recency(i64),
}

/// Post-analysis filtering of the best-candidate table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Only rank instruments whose last run ended within `recency_days` of
    /// the latest date in the table.
    pub filter_recent: bool,
    pub recency_days: i64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            filter_recent: true,
            recency_days: 60,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub regime: RegimeParams,
    pub labeling: LabelParams,
    pub evaluation: EvalParams,
    pub features: FeatureParams,
    pub selection: SelectionConfig,
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every table and return the parameters the core consumes.
    pub fn validate(&self) -> Result<PipelineParams, ConfigError> {
        let params = self.pipeline_params();
        params.validate()?;
        self.features.validate()?;
        if self.selection.recency_days < 0 {
            return Err(ConfigError::Recency(self.selection.recency_days));
        }
        Ok(params)
    }

    pub fn pipeline_params(&self) -> PipelineParams {
        PipelineParams {
            regime: self.regime.clone(),
            labeling: self.labeling.clone(),
            evaluation: self.evaluation.clone(),
        }
    }

    /// BLAKE3 hash of the canonical JSON form. Identical configs hash
    /// identically regardless of TOML layout or comments.
    pub fn fingerprint(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
