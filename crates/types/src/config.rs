//! Configuration types for the AgroTrace ledger.
//!
//! Policy knobs kept out of code: sensor
//! anomaly bounds, authenticity scoring tiers, and input size limits.
//! All structs carry serde defaults and a `validate()` method returning
//! [`ConfigError`] for post-deserialization checking.

use serde::{Deserialize, Serialize};
use snafu::Snafu;

/// Configuration validation error.
///
/// Returned when a configuration value is outside its valid range or
/// violates a cross-field constraint.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// A configuration value is invalid.
    #[snafu(display("invalid config: {message}"))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },
}

/// Top-level ledger configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Acceptable sensor ranges; readings outside are flagged as anomalies.
    #[serde(default)]
    pub sensor_bounds: SensorBounds,
    /// Authenticity scoring policy.
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Input size limits.
    #[serde(default)]
    pub validation: ValidationConfig,
}

impl LedgerConfig {
    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sensor_bounds.validate()?;
        self.scoring.validate()?;
        self.validation.validate()
    }
}

/// Acceptable cold-chain sensor ranges.
///
/// A reading is flagged anomalous when temperature or humidity falls
/// outside the closed interval. Defaults reflect refrigerated produce
/// transport: 0–10 °C and 40–95 % relative humidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorBounds {
    /// Minimum acceptable temperature, degrees Celsius.
    #[serde(default = "default_min_temp")]
    pub min_temperature_c: i32,
    /// Maximum acceptable temperature, degrees Celsius.
    #[serde(default = "default_max_temp")]
    pub max_temperature_c: i32,
    /// Minimum acceptable relative humidity, percent.
    #[serde(default = "default_min_humidity")]
    pub min_humidity_pct: u8,
    /// Maximum acceptable relative humidity, percent.
    #[serde(default = "default_max_humidity")]
    pub max_humidity_pct: u8,
}

fn default_min_temp() -> i32 {
    0
}
fn default_max_temp() -> i32 {
    10
}
fn default_min_humidity() -> u8 {
    40
}
fn default_max_humidity() -> u8 {
    95
}

impl Default for SensorBounds {
    fn default() -> Self {
        Self {
            min_temperature_c: default_min_temp(),
            max_temperature_c: default_max_temp(),
            min_humidity_pct: default_min_humidity(),
            max_humidity_pct: default_max_humidity(),
        }
    }
}

impl SensorBounds {
    /// Whether a reading falls outside the acceptable ranges.
    pub fn is_anomalous(&self, temperature_c: i32, humidity_pct: u8) -> bool {
        temperature_c < self.min_temperature_c
            || temperature_c > self.max_temperature_c
            || humidity_pct < self.min_humidity_pct
            || humidity_pct > self.max_humidity_pct
    }

    /// Validates range ordering.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a minimum exceeds its maximum or humidity
    /// bounds leave 0–100.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_temperature_c >= self.max_temperature_c {
            return Err(ConfigError::Validation {
                message: format!(
                    "min_temperature_c {} must be below max_temperature_c {}",
                    self.min_temperature_c, self.max_temperature_c
                ),
            });
        }
        if self.min_humidity_pct >= self.max_humidity_pct {
            return Err(ConfigError::Validation {
                message: format!(
                    "min_humidity_pct {} must be below max_humidity_pct {}",
                    self.min_humidity_pct, self.max_humidity_pct
                ),
            });
        }
        if self.max_humidity_pct > 100 {
            return Err(ConfigError::Validation {
                message: format!("max_humidity_pct {} exceeds 100", self.max_humidity_pct),
            });
        }
        Ok(())
    }
}

/// A single scoring tier: deduct `deduction` points when the observed value
/// strictly exceeds `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreTier {
    /// Strict lower bound for the tier to apply.
    pub threshold: u64,
    /// Points deducted when the tier applies.
    pub deduction: u8,
}

/// Authenticity scoring policy.
///
/// Tiers are evaluated highest threshold first; only the first matching
/// tier applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Deductions by whole days elapsed since harvest.
    #[serde(default = "default_age_tiers")]
    pub age_tiers: Vec<ScoreTier>,
    /// Deductions by anomaly percentage across all sensor logs.
    #[serde(default = "default_anomaly_tiers")]
    pub anomaly_tiers: Vec<ScoreTier>,
    /// Bonus for processing the first batch promptly after harvest.
    #[serde(default = "default_prompt_bonus")]
    pub prompt_processing_bonus: u8,
    /// Window, in whole days, within which the bonus applies.
    #[serde(default = "default_prompt_window")]
    pub prompt_processing_window_days: u64,
}

fn default_age_tiers() -> Vec<ScoreTier> {
    vec![
        ScoreTier { threshold: 30, deduction: 40 },
        ScoreTier { threshold: 14, deduction: 25 },
        ScoreTier { threshold: 7, deduction: 15 },
        ScoreTier { threshold: 3, deduction: 5 },
    ]
}

fn default_anomaly_tiers() -> Vec<ScoreTier> {
    vec![
        ScoreTier { threshold: 50, deduction: 30 },
        ScoreTier { threshold: 25, deduction: 20 },
        ScoreTier { threshold: 10, deduction: 10 },
    ]
}

fn default_prompt_bonus() -> u8 {
    5
}
fn default_prompt_window() -> u64 {
    2
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            age_tiers: default_age_tiers(),
            anomaly_tiers: default_anomaly_tiers(),
            prompt_processing_bonus: default_prompt_bonus(),
            prompt_processing_window_days: default_prompt_window(),
        }
    }
}

impl ScoringConfig {
    /// Validates tier ordering and deduction bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if tiers are not strictly descending by
    /// threshold or a deduction exceeds 100.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (label, tiers) in [("age_tiers", &self.age_tiers), ("anomaly_tiers", &self.anomaly_tiers)]
        {
            for pair in tiers.windows(2) {
                if pair[0].threshold <= pair[1].threshold {
                    return Err(ConfigError::Validation {
                        message: format!("{label} must be strictly descending by threshold"),
                    });
                }
            }
            if let Some(tier) = tiers.iter().find(|t| t.deduction > 100) {
                return Err(ConfigError::Validation {
                    message: format!("{label} deduction {} exceeds 100", tier.deduction),
                });
            }
        }
        Ok(())
    }
}

/// Input size limits, in UTF-8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Maximum product name length.
    #[serde(default = "default_max_name")]
    pub max_name_bytes: usize,
    /// Maximum free-text note length (harvest, processing, retail).
    #[serde(default = "default_max_notes")]
    pub max_notes_bytes: usize,
    /// Maximum certificate issuer length.
    #[serde(default = "default_max_issuer")]
    pub max_issuer_bytes: usize,
    /// Maximum packaging and location description length.
    #[serde(default = "default_max_detail")]
    pub max_detail_bytes: usize,
}

fn default_max_name() -> usize {
    128
}
fn default_max_notes() -> usize {
    1024
}
fn default_max_issuer() -> usize {
    128
}
fn default_max_detail() -> usize {
    256
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_name_bytes: default_max_name(),
            max_notes_bytes: default_max_notes(),
            max_issuer_bytes: default_max_issuer(),
            max_detail_bytes: default_max_detail(),
        }
    }
}

impl ValidationConfig {
    /// Validates that no limit is zero.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any limit is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = [
            ("max_name_bytes", self.max_name_bytes),
            ("max_notes_bytes", self.max_notes_bytes),
            ("max_issuer_bytes", self.max_issuer_bytes),
            ("max_detail_bytes", self.max_detail_bytes),
        ];
        if let Some((field, _)) = limits.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Validation { message: format!("{field} must be nonzero") });
        }
        Ok(())
    }
}
