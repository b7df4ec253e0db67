// src/config.rs
use chrono_tz::Tz;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set when MOCK_MODE is disabled")]
    MissingForLiveMode(&'static str),
}

/// Runtime settings shared by the API service, the scheduler and the console.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub mock_mode: bool,
    pub project_id: Option<String>,
    pub location: String,
    pub model: String,
    pub credentials_path: Option<PathBuf>,
    pub api_url: String,
    pub scheduler_tz: Tz,
    pub stream_delay: Duration,
    pub watchlist: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            data_dir: PathBuf::from("/data"),
            mock_mode: true,
            project_id: None,
            location: "us-central1".to_string(),
            model: "gemini-1.5-flash".to_string(),
            credentials_path: None,
            api_url: "http://api:8000".to_string(),
            scheduler_tz: Tz::UTC,
            stream_delay: Duration::from_millis(20),
            watchlist: vec!["7974.T".to_string()],
        }
    }
}

impl Config {
    /// Reads the process environment. Call `dotenv().ok()` first if a `.env`
    /// file should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                key: "PORT",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => defaults.port,
        };

        let project_id = get("PROJECT_ID");
        let credentials_path = get("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from);

        let mock_mode = match get("MOCK_MODE") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                key: "MOCK_MODE",
                value: raw.clone(),
                reason: "expected true/false".to_string(),
            })?,
            None => project_id.is_none() || credentials_path.is_none(),
        };

        if !mock_mode {
            if project_id.is_none() {
                return Err(ConfigError::MissingForLiveMode("PROJECT_ID"));
            }
            if credentials_path.is_none() {
                return Err(ConfigError::MissingForLiveMode("GOOGLE_APPLICATION_CREDENTIALS"));
            }
        }

        let scheduler_tz = match get("SCHEDULER_TZ") {
            Some(raw) => raw.parse::<Tz>().map_err(|e| ConfigError::Invalid {
                key: "SCHEDULER_TZ",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => defaults.scheduler_tz,
        };

        let stream_delay = match get("STREAM_DELAY_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| ConfigError::Invalid {
                    key: "STREAM_DELAY_MS",
                    value: raw.clone(),
                    reason: e.to_string(),
                })?,
            None => defaults.stream_delay,
        };

        let watchlist = match get("WATCHLIST") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => defaults.watchlist,
        };

        Ok(Self {
            port,
            data_dir: get("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            mock_mode,
            project_id,
            location: get("LOCATION").unwrap_or(defaults.location),
            model: get("MODEL").unwrap_or(defaults.model),
            credentials_path,
            api_url: get("API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            scheduler_tz,
            stream_delay,
            watchlist,
        })
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_stream_delay(mut self, delay: Duration) -> Self {
        self.stream_delay = delay;
        self
    }

    pub fn news_dir(&self) -> PathBuf {
        self.data_dir.join("news")
    }

    pub fn health_dir(&self) -> PathBuf {
        self.data_dir.join("health")
    }

    pub fn papers_dir(&self) -> PathBuf {
        self.data_dir.join("papers")
    }

    pub fn stocks_dir(&self) -> PathBuf {
        self.data_dir.join("stocks")
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
