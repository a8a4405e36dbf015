//! Engine configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

/// Format assumed for temporal strings when neither the field nor the config names one.
pub const DEFAULT_TEMPORAL_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Reducer applied to measures when neither the reducer spec nor the field names one.
    pub default_reducer: String,

    /// Bucket count for equal-width binning when the bin config gives neither size nor count.
    pub default_bin_count: usize,

    /// Label for values outside the configured bin range.
    pub out_of_range_label: String,

    /// chrono format used to parse temporal strings when a field carries none.
    pub temporal_format: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_reducer: "sum".to_string(),
            default_bin_count: 10,
            out_of_range_label: "out of range".to_string(),
            temporal_format: DEFAULT_TEMPORAL_FORMAT.to_string(),
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `DATAMODEL_DEFAULT_REDUCER`: reducer name
    /// - `DATAMODEL_DEFAULT_BIN_COUNT`: bucket count
    /// - `DATAMODEL_OUT_OF_RANGE_LABEL`: sentinel bin label
    /// - `DATAMODEL_TEMPORAL_FORMAT`: chrono format string
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("DATAMODEL_DEFAULT_REDUCER") {
            if !s.trim().is_empty() {
                cfg.default_reducer = s.trim().to_string();
            }
        }

        if let Ok(s) = std::env::var("DATAMODEL_DEFAULT_BIN_COUNT") {
            if let Ok(v) = s.parse::<usize>() {
                if v > 0 {
                    cfg.default_bin_count = v;
                }
            }
        }

        if let Ok(s) = std::env::var("DATAMODEL_OUT_OF_RANGE_LABEL") {
            cfg.out_of_range_label = s;
        }

        if let Ok(s) = std::env::var("DATAMODEL_TEMPORAL_FORMAT") {
            if !s.is_empty() {
                cfg.temporal_format = s;
            }
        }

        cfg
    }

    /// Overlay the values set in `overrides` onto this config.
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(r) = &overrides.default_reducer {
            self.default_reducer = r.clone();
        }
        if let Some(n) = overrides.default_bin_count {
            self.default_bin_count = n;
        }
        if let Some(l) = &overrides.out_of_range_label {
            self.out_of_range_label = l.clone();
        }
        if let Some(f) = &overrides.temporal_format {
            self.temporal_format = f.clone();
        }
    }
}

/// Partial config, as found in a pipeline document or on the command line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub default_reducer: Option<String>,
    pub default_bin_count: Option<usize>,
    pub out_of_range_label: Option<String>,
    pub temporal_format: Option<String>,
}
