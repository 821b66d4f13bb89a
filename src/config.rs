use anyhow::Result;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub upload_tick_millis: u64,
    pub session_file: String,
    pub warn_threshold_percent: f64,
    pub critical_threshold_percent: f64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5000".to_string()),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
            poll_interval_secs: env::var("POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
            upload_tick_millis: env::var("UPLOAD_TICK_MILLIS")
                .unwrap_or_else(|_| "200".to_string())
                .parse()?,
            session_file: env::var("SESSION_FILE")
                .unwrap_or_else(|_| "./session.json".to_string()),
            warn_threshold_percent: env::var("WARN_THRESHOLD_PERCENT")
                .unwrap_or_else(|_| "80".to_string())
                .parse()?,
            critical_threshold_percent: env::var("CRITICAL_THRESHOLD_PERCENT")
                .unwrap_or_else(|_| "95".to_string())
                .parse()?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: "http://localhost:5000".to_string(),
            request_timeout_secs: 10,
            poll_interval_secs: 10,
            upload_tick_millis: 200,
            session_file: "./session.json".to_string(),
            warn_threshold_percent: 80.0,
            critical_threshold_percent: 95.0,
        }
    }
}
