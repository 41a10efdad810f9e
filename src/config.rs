use crate::search::{AmadeusConfig, PRODUCTION_BASE_URL, TEST_BASE_URL};
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ORIGIN: &str = "YYZ";
pub const DEFAULT_DESTINATIONS: &[&str] = &[
    "PRG", "AMS", "FRA", "BCN", "MAD", "FCO", "VIE", "ZRH", "ARN", "OSL", "BUD",
];
pub const DEFAULT_WEEKS: u32 = 4;
pub const DEFAULT_PRICE_THRESHOLD: i64 = 400;
pub const DEFAULT_CURRENCY: &str = "CAD";
pub const DEFAULT_SEARCH_DELAY_MS: u64 = 1000;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(String),

    #[error("Invalid {key}: {value} ({reason})")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

// Three ASCII letters, returned upper-cased
fn parse_code(key: &str, value: &str) -> Result<String, ConfigError> {
    let code = value.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid(key, value, "expected a three-letter code"));
    }
    Ok(code.to_ascii_uppercase())
}

/// Search parameters for one run. Built once and only read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub origin: String,
    pub destinations: Vec<String>,
    pub weeks_horizon: u32,
    pub price_threshold: Decimal,
    pub currency: String,
}

impl RunConfig {
    pub fn new(
        origin: &str,
        destinations: &[&str],
        weeks_horizon: u32,
        price_threshold: Decimal,
        currency: &str,
    ) -> Result<Self, ConfigError> {
        let origin = parse_code("ORIGIN", origin)?;

        let mut codes: Vec<String> = Vec::with_capacity(destinations.len());
        for destination in destinations {
            let code = parse_code("DESTINATIONS", destination)?;
            // Ordered set: keep the first occurrence
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
        if codes.is_empty() {
            return Err(invalid("DESTINATIONS", "", "at least one destination"));
        }

        if weeks_horizon == 0 {
            return Err(invalid("WEEKS", "0", "must be at least 1"));
        }

        if price_threshold <= Decimal::ZERO {
            return Err(invalid(
                "PRICE_THRESHOLD",
                &price_threshold.to_string(),
                "must be positive",
            ));
        }

        Ok(Self {
            origin,
            destinations: codes,
            weeks_horizon,
            price_threshold,
            currency: parse_code("CURRENCY", currency)?,
        })
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            destinations: DEFAULT_DESTINATIONS.iter().map(|d| d.to_string()).collect(),
            weeks_horizon: DEFAULT_WEEKS,
            price_threshold: Decimal::from(DEFAULT_PRICE_THRESHOLD),
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

/// Mail delivery settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub sender_email: String,
    pub sender_password: String,
    pub recipient_email: String,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub run: RunConfig,
    pub amadeus: AmadeusConfig,
    // None in dry-run mode
    pub smtp: Option<SmtpConfig>,
    pub search_delay_ms: u64,
    pub dry_run: bool,
    pub log_level: String,
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create application config from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| ConfigError::Missing(key.to_string()));

        let dry_run = match get("DRY_RUN") {
            Some(v) => parse_bool("DRY_RUN", &v)?,
            None => false,
        };

        let origin = get("ORIGIN").unwrap_or_else(|| DEFAULT_ORIGIN.to_string());
        let destinations = get("DESTINATIONS")
            .map(|v| {
                v.split(',')
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_else(|| DEFAULT_DESTINATIONS.iter().map(|d| d.to_string()).collect());
        let destination_refs: Vec<&str> = destinations.iter().map(String::as_str).collect();

        let weeks = match get("WEEKS") {
            Some(v) => v
                .trim()
                .parse::<u32>()
                .map_err(|_| invalid("WEEKS", &v, "expected a whole number"))?,
            None => DEFAULT_WEEKS,
        };

        let threshold = match get("PRICE_THRESHOLD") {
            Some(v) => Decimal::from_str(v.trim())
                .map_err(|_| invalid("PRICE_THRESHOLD", &v, "expected a decimal amount"))?,
            None => Decimal::from(DEFAULT_PRICE_THRESHOLD),
        };

        let currency = get("CURRENCY").unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let run = RunConfig::new(&origin, &destination_refs, weeks, threshold, &currency)?;

        let base_url = match get("AMADEUS_HOSTNAME").as_deref().map(str::trim) {
            None | Some("production") => PRODUCTION_BASE_URL.to_string(),
            Some("test") => TEST_BASE_URL.to_string(),
            Some(other) => {
                return Err(invalid(
                    "AMADEUS_HOSTNAME",
                    other,
                    "must be production or test",
                ))
            }
        };

        let amadeus = AmadeusConfig {
            base_url,
            client_id: require("API_KEY")?,
            client_secret: require("API_SECRET")?,
            ..Default::default()
        };

        let smtp = if dry_run {
            None
        } else {
            let port = match get("SMTP_PORT") {
                Some(v) => v
                    .trim()
                    .parse::<u16>()
                    .map_err(|_| invalid("SMTP_PORT", &v, "expected a port number"))?,
                None => 587,
            };
            Some(SmtpConfig {
                server: get("SMTP_SERVER").unwrap_or_else(|| "smtp.gmail.com".to_string()),
                port,
                sender_email: require("SENDER_EMAIL")?,
                sender_password: require("SENDER_PASSWORD")?,
                recipient_email: require("RECIPIENT_EMAIL")?,
            })
        };

        let search_delay_ms = match get("SEARCH_DELAY_MS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .map_err(|_| invalid("SEARCH_DELAY_MS", &v, "expected milliseconds"))?,
            None => DEFAULT_SEARCH_DELAY_MS,
        };

        let log_level = get("LOG_LEVEL")
            .unwrap_or_else(|| "info".to_string())
            .to_lowercase();
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.as_str()) {
            return Err(invalid(
                "LOG_LEVEL",
                &log_level,
                "must be one of trace, debug, info, warn, error",
            ));
        }

        Ok(Self {
            run,
            amadeus,
            smtp,
            search_delay_ms,
            dry_run,
            log_level,
        })
    }

    pub fn search_delay(&self) -> Duration {
        Duration::from_millis(self.search_delay_ms)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(invalid(key, value, "expected true or false")),
    }
}
