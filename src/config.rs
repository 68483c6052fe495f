use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

const CONFIG_ENV: &str = "FASTMATH_CONFIG";
const API_KEY_ENV: &str = "FASTMATH_REPORT_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Cadences and limits for the timer set. All values are milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Reactor cadence; every timer is sampled at this granularity.
    pub tick_ms: u64,
    pub hint_poll_ms: u64,
    pub hint_display_ms: u64,
    pub hint_cooldown_ms: u64,
    /// Per-operation countdown during diagnosis.
    pub operation_limit_ms: u64,
    pub inactivity_limit_ms: u64,
    pub timer_warning_ms: u64,
    pub diagnosis_warning_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            hint_poll_ms: 500,
            hint_display_ms: 2_000,
            hint_cooldown_ms: 10_000,
            operation_limit_ms: 30_000,
            inactivity_limit_ms: 30_000,
            timer_warning_ms: 60_000,
            diagnosis_warning_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// An answer slower than `avg * slow_multiplier` counts as a weakness.
    pub slow_multiplier: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self { slow_multiplier: 1.2 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub max_factor: u32,
    pub shuffle: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            max_factor: 15,
            shuffle: true,
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub api_url: String,
    #[serde(skip)]
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout_ms: u64,
    /// Ask the model for the four-field JSON report instead of prose.
    pub structured: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            api_url: "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent".to_string(),
            api_key: None,
            temperature: 0.7,
            max_output_tokens: 300,
            timeout_ms: 15_000,
            structured: false,
        }
    }
}

// The key stays out of logs.
impl std::fmt::Debug for ReportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("timeout_ms", &self.timeout_ms)
            .field("structured", &self.structured)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub timing: TimingConfig,
    pub analyzer: AnalyzerConfig,
    pub grid: GridConfig,
    pub report: ReportConfig,
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// `FASTMATH_CONFIG` (optional JSON file) plus the report key from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.report.api_key = Some(key.trim().to_string());
            }
        }
        Ok(config)
    }
}
