use crate::domain::Decimal;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub price_api_url: String,
    /// Settlement sweep interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Balance a new user starts with.
    pub opening_balance: Decimal,
    /// Timed-bet payout on a win, as a multiple of stake.
    pub payout_multiplier: Decimal,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let price_api_url = env_map
            .get("PRICE_API_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("PRICE_API_URL".to_string()))?;

        let tick_interval_ms = env_map
            .get("TICK_INTERVAL_MS")
            .map(|s| s.as_str())
            .unwrap_or("1000")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "TICK_INTERVAL_MS".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?;

        let opening_balance = parse_decimal(&env_map, "OPENING_BALANCE", "100000")?;
        if opening_balance.is_negative() {
            return Err(ConfigError::InvalidValue(
                "OPENING_BALANCE".to_string(),
                "must be non-negative".to_string(),
            ));
        }

        let payout_multiplier = parse_decimal(&env_map, "PAYOUT_MULTIPLIER", "1.8")?;
        if !payout_multiplier.is_positive() {
            return Err(ConfigError::InvalidValue(
                "PAYOUT_MULTIPLIER".to_string(),
                "must be positive".to_string(),
            ));
        }

        Ok(Config {
            port,
            database_path,
            price_api_url,
            tick_interval_ms,
            opening_balance,
            payout_multiplier,
        })
    }
}

fn parse_decimal(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<Decimal, ConfigError> {
    let raw = env_map.get(key).map(|s| s.as_str()).unwrap_or(default);
    Decimal::from_str_canonical(raw).map_err(|_| {
        ConfigError::InvalidValue(key.to_string(), "must be a valid decimal".to_string())
    })
}
