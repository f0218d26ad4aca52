use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
    pub admission: AdmissionConfig,
    pub noc: NocConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// "memory" or "postgres"
    pub backend: String,
    pub database_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub jwt_ttl_minutes: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_max_active_rides")]
    pub max_active_rides: u64,
    #[serde(default = "default_cancel_cutoff")]
    pub cancel_cutoff_minutes: i64,
    #[serde(default = "default_reminder_window")]
    pub reminder_window_minutes: i64,
    #[serde(default = "default_reminder_period")]
    pub reminder_period_seconds: u64,
}

fn default_max_active_rides() -> u64 {
    5
}
fn default_cancel_cutoff() -> i64 {
    10
}
fn default_reminder_window() -> i64 {
    60
}
fn default_reminder_period() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdmissionConfig {
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

fn default_requests_per_minute() -> u32 {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct NocConfig {
    pub base_url: String,
    pub api_key: String,
    /// When false, the mock notifier is wired instead of the HTTP gateway
    /// (local runs without a NOC deployment).
    #[serde(default)]
    pub enabled: bool,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Layer the current environment file on top (optional)
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Finally environment variables, e.g. RIDEPOOL__SERVER__PORT=8080
            .add_source(config::Environment::with_prefix("RIDEPOOL").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
