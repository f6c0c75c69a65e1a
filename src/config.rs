//! Configuration shared by the ingestion core and its consumers.
//!
//! Every field has a default matching the reference deployment, so an empty
//! YAML/JSON document is a valid configuration.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

/// Range and step limits applied by the line parser.
///
/// A step limit of `None` disables the step check for that quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationLimits {
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    pub hum_min_pct: f64,
    pub hum_max_pct: f64,
    pub max_temp_step_c: Option<f64>,
    pub max_hum_step_pct: Option<f64>,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            temp_min_c: -40.0,
            temp_max_c: 125.0,
            hum_min_pct: 0.0,
            hum_max_pct: 100.0,
            max_temp_step_c: Some(5.0),
            max_hum_step_pct: Some(20.0),
        }
    }
}

impl ValidationLimits {
    pub fn in_range(&self, temperature: f64, humidity: f64) -> bool {
        (self.temp_min_c..=self.temp_max_c).contains(&temperature)
            && (self.hum_min_pct..=self.hum_max_pct).contains(&humidity)
    }
}

/// Tunables for tailing, buffering, export and rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Sleep between two file-size checks of a tailer.
    pub poll_interval_ms: u64,
    /// Suggested period of the consumer's drain tick.
    pub consumer_tick_ms: u64,
    /// Samples kept per channel before the oldest is evicted.
    pub buffer_capacity: usize,
    pub max_overlays: usize,
    /// Maximum points per rendered series before downsampling applies.
    pub draw_budget: usize,
    /// Maximum time distance (seconds) for nearest-time matches on export.
    pub export_tolerance_s: f64,
    pub y_pad_frac: f64,
    pub min_y_span: f64,
    /// Width of the rolling view in seconds.
    pub view_window_s: f64,
    /// Nominal sample interval used for rows without a usable timestamp.
    pub static_dt_s: f64,
    /// Recompute y-limits after this many new samples.
    pub rescale_every_n: usize,
    pub inlet_label: String,
    pub outlet_label: String,
    pub limits: ValidationLimits,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            consumer_tick_ms: 100,
            buffer_capacity: 250_000,
            max_overlays: 10,
            draw_budget: 2500,
            export_tolerance_s: 0.30,
            y_pad_frac: 0.08,
            min_y_span: 0.3,
            view_window_s: 180.0,
            static_dt_s: 0.25,
            rescale_every_n: 30,
            inlet_label: "Sensor at inlet point".to_string(),
            outlet_label: "Sensor at outlet point".to_string(),
            limits: ValidationLimits::default(),
        }
    }
}

impl IngestConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn consumer_tick(&self) -> Duration {
        Duration::from_millis(self.consumer_tick_ms)
    }

    /// Parse a configuration document. JSON is tried when the text starts with
    /// `{`, YAML otherwise.
    pub fn parse_str(text: &str) -> Result<Self> {
        let cfg: IngestConfig = if text.trim_start().starts_with('{') {
            serde_json::from_str(text).map_err(|e| IngestError::Config(e.to_string()))?
        } else if text.trim().is_empty() {
            IngestConfig::default()
        } else {
            serde_yaml::from_str(text).map_err(|e| IngestError::Config(e.to_string()))?
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| IngestError::io(path, e))?;
        Self::parse_str(&text)
    }

    /// Load from `path` if it exists, fall back to defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let text = if is_json {
            serde_json::to_string_pretty(self).map_err(|e| IngestError::Config(e.to_string()))?
        } else {
            serde_yaml::to_string(self).map_err(|e| IngestError::Config(e.to_string()))?
        };
        fs::write(path, text).map_err(|e| IngestError::io(path, e))
    }

    fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 {
            return Err(IngestError::Config("buffer_capacity must be > 0".into()));
        }
        if self.draw_budget == 0 {
            return Err(IngestError::Config("draw_budget must be > 0".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(IngestError::Config("poll_interval_ms must be > 0".into()));
        }
        if !(self.export_tolerance_s >= 0.0) {
            return Err(IngestError::Config(
                "export_tolerance_s must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        let cfg = IngestConfig::parse_str("").unwrap();
        assert_eq!(cfg, IngestConfig::default());
    }

    #[test]
    fn partial_yaml_overrides_only_given_fields() {
        let cfg = IngestConfig::parse_str("draw_budget: 100\nlimits:\n  max_temp_step_c: null\n")
            .unwrap();
        assert_eq!(cfg.draw_budget, 100);
        assert_eq!(cfg.buffer_capacity, 250_000);
        assert_eq!(cfg.limits.max_temp_step_c, None);
        assert_eq!(cfg.limits.max_hum_step_pct, Some(20.0));
    }

    #[test]
    fn json_is_detected() {
        let cfg = IngestConfig::parse_str(r#"{ "max_overlays": 3 }"#).unwrap();
        assert_eq!(cfg.max_overlays, 3);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = IngestConfig::parse_str("buffer_capacity: 0").unwrap_err();
        assert!(matches!(err, IngestError::Config(_)));
    }

    #[test]
    fn range_check_is_inclusive() {
        let l = ValidationLimits::default();
        assert!(l.in_range(-40.0, 0.0));
        assert!(l.in_range(125.0, 100.0));
        assert!(!l.in_range(125.1, 50.0));
        assert!(!l.in_range(20.0, -0.1));
    }
}
