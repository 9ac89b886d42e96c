use std::env;
use std::fmt;
use std::str::FromStr;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub valuation: ValuationConfig,
    pub matching: MatchingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let defaults = ValuationConfig::default();
        let valuation = ValuationConfig {
            deal_discount_threshold: read_var(
                "DEAL_DISCOUNT_THRESHOLD",
                defaults.deal_discount_threshold,
            )?,
            radius_miles: read_var("CMA_RADIUS_MILES", defaults.radius_miles)?,
            default_days_back: read_var("CMA_DAYS_BACK", defaults.default_days_back)?,
            freshness_days: read_var("CMA_FRESHNESS_DAYS", defaults.freshness_days)?,
        };
        valuation.validate()?;

        let defaults = MatchingConfig::default();
        let matching = MatchingConfig {
            decay_window_days: read_var("PREFERENCE_DECAY_DAYS", defaults.decay_window_days)?,
            learning_rate: read_var("PREFERENCE_LEARNING_RATE", defaults.learning_rate)?,
        };
        matching.validate()?;

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level },
            valuation,
            matching,
        })
    }
}

fn read_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        _ => Ok(default),
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Knobs for comparable selection and deal detection.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuationConfig {
    /// A listing priced at or below this fraction of its estimate raises a deal alert.
    pub deal_discount_threshold: f64,
    pub radius_miles: f64,
    /// `days_back` reported for comparables without an off-market or update date.
    pub default_days_back: i64,
    /// Window in which a previously computed valuation is reused by callers.
    pub freshness_days: i64,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            deal_discount_threshold: 0.8,
            radius_miles: 1.0,
            default_days_back: 180,
            freshness_days: 3,
        }
    }
}

impl ValuationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.deal_discount_threshold > 0.0 && self.deal_discount_threshold <= 1.0) {
            return Err(ConfigError::OutOfRange {
                name: "DEAL_DISCOUNT_THRESHOLD",
                expected: "a ratio in (0, 1]",
            });
        }
        if !(self.radius_miles > 0.0) {
            return Err(ConfigError::OutOfRange {
                name: "CMA_RADIUS_MILES",
                expected: "a positive distance",
            });
        }
        if self.default_days_back < 0 || self.freshness_days < 0 {
            return Err(ConfigError::OutOfRange {
                name: "CMA_DAYS_BACK/CMA_FRESHNESS_DAYS",
                expected: "a non-negative day count",
            });
        }
        Ok(())
    }
}

/// Knobs for online preference learning.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingConfig {
    pub decay_window_days: i64,
    pub learning_rate: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            decay_window_days: 45,
            learning_rate: 0.25,
        }
    }
}

impl MatchingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.decay_window_days < 1 {
            return Err(ConfigError::OutOfRange {
                name: "PREFERENCE_DECAY_DAYS",
                expected: "at least one day",
            });
        }
        if !(self.learning_rate > 0.0) {
            return Err(ConfigError::OutOfRange {
                name: "PREFERENCE_LEARNING_RATE",
                expected: "a positive rate",
            });
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { name: &'static str, value: String },
    OutOfRange {
        name: &'static str,
        expected: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue { name, value } => {
                write!(f, "{name} could not be parsed from '{value}'")
            }
            ConfigError::OutOfRange { name, expected } => {
                write!(f, "{name} must be {expected}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_LOG_LEVEL",
            "DEAL_DISCOUNT_THRESHOLD",
            "CMA_RADIUS_MILES",
            "CMA_DAYS_BACK",
            "CMA_FRESHNESS_DAYS",
            "PREFERENCE_DECAY_DAYS",
            "PREFERENCE_LEARNING_RATE",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.valuation, ValuationConfig::default());
        assert_eq!(config.matching, MatchingConfig::default());
    }

    #[test]
    fn load_reads_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "prod");
        env::set_var("DEAL_DISCOUNT_THRESHOLD", "0.75");
        env::set_var("PREFERENCE_DECAY_DAYS", "30");
        let config = AppConfig::load().expect("config loads");
        reset_env();
        assert_eq!(config.environment, AppEnvironment::Production);
        assert_eq!(config.valuation.deal_discount_threshold, 0.75);
        assert_eq!(config.matching.decay_window_days, 30);
    }

    #[test]
    fn rejects_unparseable_and_out_of_range_values() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("CMA_RADIUS_MILES", "far");
        let err = AppConfig::load().expect_err("radius must parse");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                name: "CMA_RADIUS_MILES",
                ..
            }
        ));

        reset_env();
        env::set_var("PREFERENCE_DECAY_DAYS", "0");
        let err = AppConfig::load().expect_err("decay window must be positive");
        reset_env();
        assert!(err.to_string().contains("PREFERENCE_DECAY_DAYS"));
    }
}
