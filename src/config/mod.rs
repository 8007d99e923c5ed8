//! Configuration management for TokenOptimizer
//!
//! Supports configuration via:
//! 1. Config file (~/.config/token-optimizer/config.toml)
//! 2. Environment variables (TOKEN_OPTIMIZER_PRESET, TOKEN_OPTIMIZER_MODEL, etc.)
//! 3. CLI arguments (override file/env settings)

use crate::cache::CacheConfig;
use crate::optimization::{OptimizationOptions, Preset, StageToggles, DEFAULT_MODEL};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const ENV_PRESET: &str = "TOKEN_OPTIMIZER_PRESET";
pub const ENV_MODEL: &str = "TOKEN_OPTIMIZER_MODEL";
pub const ENV_TARGET_SAVINGS: &str = "TOKEN_OPTIMIZER_TARGET_SAVINGS";
pub const ENV_MAX_TOKENS: &str = "TOKEN_OPTIMIZER_MAX_TOKENS";
pub const ENV_CACHE: &str = "TOKEN_OPTIMIZER_CACHE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Unknown config key: {0}")]
    UnknownKey(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pipeline settings
    pub optimization: OptimizationSettings,

    /// Result cache settings
    pub cache: CacheSettings,

    /// Input limits enforced by the CLI
    pub limits: LimitSettings,
}

/// Optimization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationSettings {
    /// Starting filler-removal tier
    pub preset: Preset,

    /// Desired reduction in percent, wins over `max_tokens`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_savings_percent: Option<f64>,

    /// Absolute token ceiling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,

    /// Model whose chars-per-token ratio is used for estimates
    pub model: String,

    pub semantic: bool,
    pub whitespace: bool,
    pub duplicates: bool,
    pub summarization: bool,
    pub context: bool,
}

impl Default for OptimizationSettings {
    fn default() -> Self {
        Self {
            preset: Preset::default(),
            target_savings_percent: None,
            max_tokens: None,
            model: DEFAULT_MODEL.to_string(),
            semantic: true,
            whitespace: true,
            duplicates: true,
            summarization: true,
            context: true,
        }
    }
}

/// Cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Reuse results for repeated (input, options) pairs
    pub enabled: bool,

    /// Maximum cached results before LRU eviction
    pub max_entries: usize,

    /// Seconds a cached result stays valid
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1000,
            ttl_secs: 3600,
        }
    }
}

impl CacheSettings {
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_entries: self.max_entries,
            ttl: Duration::from_secs(self.ttl_secs),
        }
    }
}

/// Input limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    /// Larger inputs are rejected before optimization
    pub max_input_bytes: usize,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_input_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Get default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("token-optimizer")
            .join("config.toml")
    }

    /// Load config from default location
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_path())
    }

    /// Load config from specific path, falling back to defaults when absent
    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        Ok(Self::read_from(path)?.with_env_overrides())
    }

    /// File contents only, without environment overrides. Use this before
    /// writing the config back.
    pub fn read_from(path: PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load config from a path that must exist
    pub fn load_existing(path: PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        Self::load_from(path)
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable source. Unparseable values are ignored.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(preset) = lookup(ENV_PRESET).and_then(|v| v.parse().ok()) {
            self.optimization.preset = preset;
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.optimization.model = model;
        }
        if let Some(percent) = lookup(ENV_TARGET_SAVINGS).and_then(|v| v.trim().parse().ok()) {
            self.optimization.target_savings_percent = Some(percent);
        }
        if let Some(tokens) = lookup(ENV_MAX_TOKENS).and_then(|v| v.trim().parse().ok()) {
            self.optimization.max_tokens = Some(tokens);
        }
        if let Some(enabled) = lookup(ENV_CACHE).and_then(|v| parse_bool(&v)) {
            self.cache.enabled = enabled;
        }
        self
    }

    /// Save config to default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::default_path())
    }

    /// Save config to specific path
    pub fn save_to(&self, path: PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Set a single value by dotted key, e.g. `optimization.preset`
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let opt = &mut self.optimization;
        match key {
            "optimization.preset" => opt.preset = parse_value(key, value)?,
            "optimization.target_savings_percent" => {
                opt.target_savings_percent = parse_optional(key, value)?
            }
            "optimization.max_tokens" => opt.max_tokens = parse_optional(key, value)?,
            "optimization.model" => opt.model = value.to_string(),
            "optimization.semantic" => opt.semantic = parse_flag(key, value)?,
            "optimization.whitespace" => opt.whitespace = parse_flag(key, value)?,
            "optimization.duplicates" => opt.duplicates = parse_flag(key, value)?,
            "optimization.summarization" => opt.summarization = parse_flag(key, value)?,
            "optimization.context" => opt.context = parse_flag(key, value)?,
            "cache.enabled" => self.cache.enabled = parse_flag(key, value)?,
            "cache.max_entries" => self.cache.max_entries = parse_value(key, value)?,
            "cache.ttl_secs" => self.cache.ttl_secs = parse_value(key, value)?,
            "limits.max_input_bytes" => self.limits.max_input_bytes = parse_value(key, value)?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Pipeline options described by the `[optimization]` section
    pub fn to_options(&self) -> OptimizationOptions {
        let opt = &self.optimization;
        OptimizationOptions {
            target_savings_percent: opt.target_savings_percent,
            max_tokens: opt.max_tokens,
            preset: opt.preset,
            toggles: StageToggles {
                semantic: opt.semantic,
                whitespace: opt.whitespace,
                duplicates: opt.duplicates,
                summarization: opt.summarization,
                context: opt.context,
            },
            content_type: None,
            model: opt.model.clone(),
        }
    }

    /// Generate example config content
    pub fn example() -> String {
        let example = ConfigBuilder::new()
            .target_savings_percent(20.0)
            .max_tokens(4000)
            .build();
        toml::to_string_pretty(&example).unwrap_or_default()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| invalid(key, value))
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

/// `none` or an empty string clears the setting
fn parse_optional<T: FromStr>(key: &str, value: &str) -> Result<Option<T>, ConfigError> {
    match value.trim() {
        "" | "none" => Ok(None),
        other => parse_value(key, other).map(Some),
    }
}

/// Builder for creating Config programmatically
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn preset(mut self, preset: Preset) -> Self {
        self.config.optimization.preset = preset;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.optimization.model = model.into();
        self
    }

    pub fn target_savings_percent(mut self, percent: f64) -> Self {
        self.config.optimization.target_savings_percent = Some(percent);
        self
    }

    pub fn max_tokens(mut self, tokens: usize) -> Self {
        self.config.optimization.max_tokens = Some(tokens);
        self
    }

    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.config.cache.enabled = enabled;
        self
    }

    pub fn cache_ttl_secs(mut self, secs: u64) -> Self {
        self.config.cache.ttl_secs = secs;
        self
    }

    pub fn max_input_bytes(mut self, bytes: usize) -> Self {
        self.config.limits.max_input_bytes = bytes;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
