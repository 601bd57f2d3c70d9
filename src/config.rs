//! Configuration management with validation and defaults
//!
//! Settings are read from an optional TOML file, then overridden by
//! `CRASH_*` environment variables, then validated.

use crate::errors::{ConfigurationError, CrashResult};
use crate::games::{
    clock::{MultiplierClock, DEFAULT_GROWTH_RATE_PER_MS},
    engine::RoundSettings,
    fairness::CrashDistribution,
    ledger::BettingRules,
    types::{Amount, Multiplier},
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Base units per whole coin
pub const BASE_UNITS_PER_COIN: Amount = 1_000_000_000;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrashConfig {
    pub betting: BettingConfig,
    pub clock: ClockConfig,
    pub fairness: FairnessConfig,
    pub scheduler: SchedulerConfig,
    pub api: ApiConfig,
    pub monitoring: MonitoringConfig,
}

/// Wager limits and the betting window
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BettingConfig {
    pub min_bet: Amount,
    pub max_bet: Amount,
    pub betting_window_ms: u64,
    pub allow_multiple_bets_per_player: bool,
}

impl Default for BettingConfig {
    fn default() -> Self {
        Self {
            min_bet: BASE_UNITS_PER_COIN / 10,
            max_bet: 10 * BASE_UNITS_PER_COIN,
            betting_window_ms: 5_000,
            allow_multiple_bets_per_player: false,
        }
    }
}

impl BettingConfig {
    pub fn rules(&self) -> BettingRules {
        BettingRules {
            min_bet: self.min_bet,
            max_bet: self.max_bet,
            allow_multiple_bets_per_player: self.allow_multiple_bets_per_player,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub growth_rate_per_ms: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            growth_rate_per_ms: DEFAULT_GROWTH_RATE_PER_MS,
        }
    }
}

/// Crash distribution and house key
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FairnessConfig {
    pub instant_crash_divisor: u64,
    /// Cap on the crash point, in hundredths
    pub max_crash_multiplier: u64,
    /// Hex mini secret key for reveal signatures; random per process when unset
    pub signing_seed_hex: Option<String>,
    /// Seeds the entropy source for reproducible simulations
    pub deterministic_entropy: Option<u64>,
}

impl Default for FairnessConfig {
    fn default() -> Self {
        Self {
            instant_crash_divisor: 33,
            max_crash_multiplier: 100_000_000,
            signing_seed_hex: None,
            deterministic_entropy: None,
        }
    }
}

impl FairnessConfig {
    pub fn distribution(&self) -> CrashDistribution {
        CrashDistribution {
            instant_crash_divisor: self.instant_crash_divisor,
            max_multiplier: Multiplier::from_hundredths(self.max_crash_multiplier),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Snapshot publication interval while a round is live
    pub tick_interval_ms: u64,
    pub command_buffer: usize,
    pub event_buffer: usize,
    pub history_capacity: usize,
    /// Stop after this many rounds; run forever when unset
    pub max_rounds: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            command_buffer: 1024,
            event_buffer: 1024,
            history_capacity: 1000,
            max_rounds: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 8080,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Default tracing filter; `RUST_LOG` wins when set
    pub log_filter: String,
    pub enable_metrics: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_filter: "crashpoint=info,tower_http=info".to_string(),
            enable_metrics: true,
        }
    }
}

impl CrashConfig {
    /// Short rounds and a fixed entropy seed, for local play and demos
    pub fn fast_rounds() -> Self {
        Self {
            betting: BettingConfig {
                betting_window_ms: 2_000,
                ..Default::default()
            },
            clock: ClockConfig {
                growth_rate_per_ms: 0.0002,
            },
            fairness: FairnessConfig {
                deterministic_entropy: Some(7),
                ..Default::default()
            },
            scheduler: SchedulerConfig {
                tick_interval_ms: 50,
                history_capacity: 100,
                ..Default::default()
            },
            monitoring: MonitoringConfig {
                log_filter: "crashpoint=debug,tower_http=info".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn round_settings(&self) -> RoundSettings {
        RoundSettings {
            rules: self.betting.rules(),
            betting_window_ms: self.betting.betting_window_ms,
            clock: MultiplierClock::new(self.clock.growth_rate_per_ms),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.scheduler.tick_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> CrashResult<()> {
        fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigurationError {
            ConfigurationError::InvalidValue {
                field: field.to_string(),
                value: value.to_string(),
                reason: reason.to_string(),
            }
        }

        if self.betting.min_bet == 0 {
            return Err(invalid("betting.min_bet", 0, "Minimum bet must be positive").into());
        }
        if self.betting.max_bet < self.betting.min_bet {
            return Err(invalid(
                "betting.max_bet",
                self.betting.max_bet,
                "Maximum bet must not be below the minimum bet",
            )
            .into());
        }
        if self.betting.betting_window_ms == 0 {
            return Err(invalid("betting.betting_window_ms", 0, "Betting window cannot be zero").into());
        }

        let rate = self.clock.growth_rate_per_ms;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(invalid("clock.growth_rate_per_ms", rate, "Growth rate must be positive").into());
        }

        if self.fairness.instant_crash_divisor < 2 {
            return Err(invalid(
                "fairness.instant_crash_divisor",
                self.fairness.instant_crash_divisor,
                "Divisor must be at least 2",
            )
            .into());
        }
        if self.fairness.max_crash_multiplier <= Multiplier::SCALE {
            return Err(invalid(
                "fairness.max_crash_multiplier",
                self.fairness.max_crash_multiplier,
                "Cap must exceed 1.00x (100 hundredths)",
            )
            .into());
        }
        if let Some(seed_hex) = &self.fairness.signing_seed_hex {
            if seed_hex.trim().len() != 64 || hex::decode(seed_hex.trim()).is_err() {
                return Err(invalid(
                    "fairness.signing_seed_hex",
                    "<redacted>",
                    "Signing seed must be 32 bytes of hex",
                )
                .into());
            }
        }

        if self.scheduler.tick_interval_ms == 0 {
            return Err(invalid("scheduler.tick_interval_ms", 0, "Tick interval cannot be zero").into());
        }
        if self.scheduler.command_buffer == 0 || self.scheduler.event_buffer == 0 {
            return Err(ConfigurationError::ValidationFailed(
                "scheduler buffers must hold at least one message".to_string(),
            )
            .into());
        }
        if self.scheduler.history_capacity == 0 {
            return Err(invalid("scheduler.history_capacity", 0, "History capacity cannot be zero").into());
        }

        if self.api.enabled && self.api.port == 0 {
            return Err(invalid("api.port", 0, "API port cannot be zero when API is enabled").into());
        }
        if self.api.request_timeout_secs == 0 {
            return Err(invalid("api.request_timeout_secs", 0, "Request timeout cannot be zero").into());
        }

        Ok(())
    }
}

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    config_path: Option<String>,
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_path: None,
            env_prefix: "CRASH".to_string(),
        }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = prefix.to_string();
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> CrashResult<CrashConfig> {
        let mut config = if let Some(ref path) = self.config_path {
            self.load_from_file(path)?
        } else {
            CrashConfig::default()
        };

        self.apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> CrashResult<CrashConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    fn env_override<T: FromStr>(&self, name: &str, reason: &str) -> CrashResult<Option<T>> {
        let key = format!("{}_{}", self.env_prefix, name);
        match env::var(&key) {
            Ok(value) => value.parse().map(Some).map_err(|_| {
                ConfigurationError::InvalidValue {
                    field: key,
                    value,
                    reason: reason.to_string(),
                }
                .into()
            }),
            Err(_) => Ok(None),
        }
    }

    fn apply_env_overrides(&self, config: &mut CrashConfig) -> CrashResult<()> {
        // Betting
        if let Some(v) = self.env_override("MIN_BET", "Invalid amount")? {
            config.betting.min_bet = v;
        }
        if let Some(v) = self.env_override("MAX_BET", "Invalid amount")? {
            config.betting.max_bet = v;
        }
        if let Some(v) = self.env_override("BETTING_WINDOW_MS", "Invalid duration")? {
            config.betting.betting_window_ms = v;
        }

        // Clock and fairness
        if let Some(v) = self.env_override("GROWTH_RATE_PER_MS", "Invalid rate")? {
            config.clock.growth_rate_per_ms = v;
        }
        if let Some(v) = self.env_override::<String>("SIGNING_SEED_HEX", "Invalid key")? {
            config.fairness.signing_seed_hex = Some(v);
        }
        if let Some(v) = self.env_override("DETERMINISTIC_ENTROPY", "Invalid seed")? {
            config.fairness.deterministic_entropy = Some(v);
        }

        // Scheduler
        if let Some(v) = self.env_override("MAX_ROUNDS", "Invalid round count")? {
            config.scheduler.max_rounds = Some(v);
        }

        // API
        if let Some(v) = self.env_override("API_ENABLED", "Invalid boolean value")? {
            config.api.enabled = v;
        }
        if let Some(v) = self.env_override::<String>("API_HOST", "Invalid host")? {
            config.api.host = v;
        }
        if let Some(v) = self.env_override("API_PORT", "Invalid port number")? {
            config.api.port = v;
        }

        if let Some(v) = self.env_override::<String>("LOG_FILTER", "Invalid filter")? {
            config.monitoring.log_filter = v;
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &CrashConfig, path: &str) -> CrashResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config(path: &str) -> CrashResult<()> {
    ConfigLoader::new().save(&CrashConfig::default(), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CrashError;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = CrashConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.betting.min_bet, 100_000_000);
        assert_eq!(config.betting.max_bet, 10_000_000_000);
        assert_eq!(config.betting.betting_window_ms, 5_000);
        assert!(!config.betting.allow_multiple_bets_per_player);
    }

    #[test]
    fn test_fast_rounds_config_is_valid() {
        let config = CrashConfig::fast_rounds();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_invalid_values() {
        let mut config = CrashConfig::default();
        config.betting.max_bet = config.betting.min_bet - 1;
        assert!(config.validate().is_err());

        let mut config = CrashConfig::default();
        config.clock.growth_rate_per_ms = 0.0;
        assert!(config.validate().is_err());

        let mut config = CrashConfig::default();
        config.fairness.instant_crash_divisor = 1;
        assert!(config.validate().is_err());

        let mut config = CrashConfig::default();
        config.fairness.signing_seed_hex = Some("abcd".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        let mut config = CrashConfig::fast_rounds();
        config.scheduler.max_rounds = Some(3);

        let loader = ConfigLoader::new().with_env_prefix("CRASH_TEST_SAVE_LOAD");
        loader.save(&config, path).unwrap();

        let loaded = ConfigLoader::new()
            .with_env_prefix("CRASH_TEST_SAVE_LOAD")
            .with_path(path)
            .load()
            .unwrap();
        assert_eq!(loaded.betting.betting_window_ms, 2_000);
        assert_eq!(loaded.scheduler.max_rounds, Some(3));
        assert_eq!(loaded.fairness.deterministic_entropy, Some(7));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: CrashConfig = toml::from_str("[betting]\nbetting_window_ms = 3000\n").unwrap();
        assert_eq!(config.betting.betting_window_ms, 3_000);
        assert_eq!(config.betting.min_bet, 100_000_000);
        assert_eq!(config.api.port, 8080);
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("CRASH_TEST_ENV_API_PORT", "9191");
        env::set_var("CRASH_TEST_ENV_BETTING_WINDOW_MS", "1500");
        let config = ConfigLoader::new().with_env_prefix("CRASH_TEST_ENV").load().unwrap();
        assert_eq!(config.api.port, 9191);
        assert_eq!(config.betting.betting_window_ms, 1_500);

        env::set_var("CRASH_TEST_BAD_API_PORT", "not-a-port");
        let result = ConfigLoader::new().with_env_prefix("CRASH_TEST_BAD").load();
        assert!(matches!(
            result,
            Err(CrashError::Configuration(ConfigurationError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigLoader::new().with_path("/nonexistent/crash.toml").load();
        assert!(matches!(
            result,
            Err(CrashError::Configuration(ConfigurationError::LoadFailed(_)))
        ));
    }
}
