//! Detector configuration and on-disk settings.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Sampling interval of the sensor binding (~30Hz). Owned by the sample
/// source, never read by the detector itself.
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 33;

/// Environment override for the global feature flag.
pub const FEATURE_FLAG_ENV: &str = "SHAKE_TO_ORDER_ENABLED";

/// How easily a shake triggers. Higher sensitivity lowers the effective
/// spike threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Low,
    #[default]
    Medium,
    High,
}

impl Sensitivity {
    // Empirical values; recalibrate per device family rather than trusting them.
    pub fn multiplier(&self) -> f64 {
        match self {
            Sensitivity::Low => 1.5,
            Sensitivity::Medium => 1.0,
            Sensitivity::High => 0.6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sensitivity::Low => "low",
            Sensitivity::Medium => "medium",
            Sensitivity::High => "high",
        }
    }
}

impl FromStr for Sensitivity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Sensitivity::Low),
            "medium" => Ok(Sensitivity::Medium),
            "high" => Ok(Sensitivity::High),
            _ => Err(ConfigError::UnknownSensitivity(s.to_string())),
        }
    }
}

/// Parameters of one detector instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Base spike threshold (m/s² above the rolling average).
    pub spike_threshold: f64,
    /// Minimum time between two completions.
    pub cooldown_ms: u64,
    pub sensitivity: Sensitivity,
    /// How long spiking must be sustained before a shake completes.
    pub sustained_duration_ms: u64,
    /// How long spiking may drop out before a session is abandoned.
    pub interruption_grace_ms: u64,
    pub enabled: bool,
    /// Emit per-tick diagnostics at debug level.
    pub debug: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            spike_threshold: 8.0,
            cooldown_ms: 2000,
            sensitivity: Sensitivity::Medium,
            sustained_duration_ms: 3000,
            interruption_grace_ms: 1000,
            enabled: true,
            debug: false,
        }
    }
}

impl DetectorConfig {
    pub fn sensitivity_multiplier(&self) -> f64 {
        self.sensitivity.multiplier()
    }

    /// Threshold the spike is actually compared against.
    pub fn effective_threshold(&self) -> f64 {
        self.spike_threshold * self.sensitivity_multiplier()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // `!(x > 0.0)` also catches NaN.
        if !(self.spike_threshold > 0.0) || !self.spike_threshold.is_finite() {
            return Err(ConfigError::NonPositive {
                field: "spike_threshold",
                value: self.spike_threshold,
            });
        }
        let durations = [
            ("cooldown_ms", self.cooldown_ms),
            ("sustained_duration_ms", self.sustained_duration_ms),
            ("interruption_grace_ms", self.interruption_grace_ms),
        ];
        for (field, value) in durations {
            if value == 0 {
                return Err(ConfigError::NonPositive {
                    field,
                    value: value as f64,
                });
            }
        }
        Ok(())
    }
}

/// Everything read from a settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShakeSettings {
    /// Global "shake to order" feature flag.
    pub feature_enabled: bool,
    pub sample_interval_ms: u64,
    pub detector: DetectorConfig,
}

impl Default for ShakeSettings {
    fn default() -> Self {
        Self {
            feature_enabled: true,
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            detector: DetectorConfig::default(),
        }
    }
}

impl ShakeSettings {
    /// Loads and validates settings from a JSON file. Missing fields take
    /// their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: ShakeSettings =
            serde_json::from_str(&content).map_err(|source| ConfigError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_interval_ms == 0 {
            return Err(ConfigError::NonPositive {
                field: "sample_interval_ms",
                value: 0.0,
            });
        }
        self.detector.validate()
    }

    /// Applies `SHAKE_TO_ORDER_ENABLED` if it is set to a recognized value.
    pub fn apply_env(&mut self) {
        if let Some(enabled) = std::env::var(FEATURE_FLAG_ENV)
            .ok()
            .and_then(|value| parse_flag(&value))
        {
            self.feature_enabled = enabled;
        }
    }
}

/// Reads a boolean environment-style flag. Unrecognized values are `None`.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}
