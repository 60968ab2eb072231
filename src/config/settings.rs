use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::client::RetryPolicy;
use crate::config::{ConfigError, DEFAULT_BASE_URL, DEFAULT_CSV_PATH, DEFAULT_ENDPOINT, DEFAULT_LOG_FILE};
use crate::source::CsvSource;
use crate::storage::JsonLedger;

/// Runtime configuration, read from `VEHICLE_SYNC_*` variables.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Bearer token for the remote API. Submissions are refused without one.
    pub token: Option<String>,
    pub base_url: String,
    pub endpoint: String,
    pub csv_path: PathBuf,
    pub request_timeout: Duration,
    /// Maximum attempts per record, including the first.
    pub max_retries: u32,
    pub batch_size: usize,
    pub batch_pause: Duration,
    pub record_pause: Duration,
    pub tolerate_corrupt_ledger: bool,
    pub log_level: String,
    pub log_file: PathBuf,
    pub bind_address: SocketAddr
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Unset or blank keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>
    {
        let get = |key: &str| lookup(key).map(|value| value.trim().to_string()).filter(|value| !value.is_empty());

        let max_retries: u32 = parse_or(&get, "VEHICLE_SYNC_MAX_RETRIES", 3)?;
        let batch_size: usize = parse_or(&get, "VEHICLE_SYNC_BATCH_SIZE", 10)?;

        if max_retries == 0 {
            return Err(ConfigError::invalid("VEHICLE_SYNC_MAX_RETRIES", "0", "must be at least 1"));
        }

        if batch_size == 0 {
            return Err(ConfigError::invalid("VEHICLE_SYNC_BATCH_SIZE", "0", "must be at least 1"));
        }

        Ok(Self {
            token: get("VEHICLE_SYNC_TOKEN"),
            base_url: get("VEHICLE_SYNC_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            endpoint: get("VEHICLE_SYNC_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            csv_path: get("VEHICLE_SYNC_CSV").unwrap_or_else(|| DEFAULT_CSV_PATH.to_string()).into(),
            request_timeout: Duration::from_secs(parse_or(&get, "VEHICLE_SYNC_TIMEOUT_SECS", 30)?),
            max_retries,
            batch_size,
            batch_pause: Duration::from_millis(parse_or(&get, "VEHICLE_SYNC_BATCH_PAUSE_MS", 1000)?),
            record_pause: Duration::from_millis(parse_or(&get, "VEHICLE_SYNC_RECORD_PAUSE_MS", 100)?),
            tolerate_corrupt_ledger: parse_flag(&get, "VEHICLE_SYNC_TOLERATE_CORRUPT_LEDGER")?,
            log_level: get("VEHICLE_SYNC_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_file: get("VEHICLE_SYNC_LOG_FILE").unwrap_or_else(|| DEFAULT_LOG_FILE.to_string()).into(),
            bind_address: parse_or(&get, "VEHICLE_SYNC_BIND", default_bind_address())?
        })
    }

    pub fn token_configured(&self) -> bool {
        self.token.is_some()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries)
    }

    pub fn source(&self) -> CsvSource {
        CsvSource::new(&self.csv_path)
    }

    pub fn ledger(&self) -> JsonLedger {
        JsonLedger::for_csv(&self.csv_path).with_corruption_tolerance(self.tolerate_corrupt_ledger)
    }
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
    G: Fn(&str) -> Option<String>
{
    match get(key) {
        Some(value) => value.parse().map_err(|error: T::Err| ConfigError::invalid(key, &value, error)),
        None => Ok(default)
    }
}

fn parse_flag<G>(get: &G, key: &'static str) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>
{
    match get(key).map(|value| value.to_lowercase()).as_deref() {
        None | Some("0" | "false" | "no" | "off") => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some(other) => Err(ConfigError::invalid(key, other, "expected true or false"))
    }
}
