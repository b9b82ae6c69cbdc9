//! Configuration types for the seatwatch service

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::monitor::MonitorTarget;

pub const CLIENT_ID_ENV: &str = "SEATWATCH_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "SEATWATCH_CLIENT_SECRET";

/// Documented request limit of the availability API
pub const API_REQUESTS_PER_MINUTE: u32 = 60;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Registration term all courses belong to
    #[serde(default)]
    pub term: u32,
    /// Course (class number) identifiers to watch
    #[serde(default)]
    pub courses: Vec<u32>,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// JSON field holding the open seat count in a class response
    #[serde(default = "default_seats_field")]
    pub seats_field: String,
    #[serde(default = "default_refresh_period", with = "humantime_serde")]
    pub refresh_period: Duration,
    #[serde(default = "default_poll_period", with = "humantime_serde")]
    pub poll_period: Duration,
    /// Nominal server-side lifetime of a bearer token
    #[serde(default = "default_token_lifetime", with = "humantime_serde")]
    pub token_lifetime: Duration,
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
    /// First retry delay after a failed refresh; doubles per consecutive failure
    #[serde(default = "default_refresh_retry", with = "humantime_serde")]
    pub refresh_retry: Duration,
    #[serde(default = "default_max_requests_per_minute")]
    pub max_requests_per_minute: u32,
    #[serde(default)]
    pub alert_reset: AlertReset,
    #[serde(default = "default_alert_queue_size")]
    pub alert_queue_size: usize,
    #[serde(default = "default_alert_history_size")]
    pub alert_history_size: usize,
    #[serde(default = "default_alerts")]
    pub alerts: Vec<AlertSinkConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            term: 0,
            courses: Vec::new(),
            client_id: String::new(),
            client_secret: String::new(),
            auth_url: default_auth_url(),
            api_base_url: default_api_base_url(),
            seats_field: default_seats_field(),
            refresh_period: default_refresh_period(),
            poll_period: default_poll_period(),
            token_lifetime: default_token_lifetime(),
            request_timeout: default_request_timeout(),
            refresh_retry: default_refresh_retry(),
            max_requests_per_minute: default_max_requests_per_minute(),
            alert_reset: AlertReset::default(),
            alert_queue_size: default_alert_queue_size(),
            alert_history_size: default_alert_history_size(),
            alerts: default_alerts(),
        }
    }
}

/// When a target that has alerted may alert again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum AlertReset {
    /// Alert once per target for the lifetime of the process
    Never,
    /// Re-arm once the target is observed with zero open seats
    #[default]
    WhenClosed,
    /// Like `WhenClosed`, and also repeat while seats stay open
    Cooldown {
        #[serde(with = "humantime_serde")]
        after: Duration,
    },
}

/// Alert sink configuration with tagged enum for extensibility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AlertSinkConfig {
    #[serde(rename = "bell")]
    Bell,
    #[serde(rename = "command")]
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
    #[serde(rename = "pushover")]
    Pushover {
        api_token: String,
        user_key: String,
        #[serde(default = "default_pushover_title")]
        title: String,
        #[serde(default)]
        priority: i8,
        #[serde(default = "default_pushover_sound")]
        sound: String,
    },
}

impl AlertSinkConfig {
    pub fn type_name(&self) -> &str {
        match self {
            AlertSinkConfig::Bell => "bell",
            AlertSinkConfig::Command { .. } => "command",
            AlertSinkConfig::Pushover { .. } => "pushover",
        }
    }
}

impl Config {
    /// The monitored (term, course) pairs, in configured order without duplicates
    pub fn targets(&self) -> Vec<MonitorTarget> {
        let mut targets: Vec<MonitorTarget> = Vec::with_capacity(self.courses.len());
        for &course_id in &self.courses {
            let target = MonitorTarget {
                term: self.term,
                course_id,
            };
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        targets
    }

    /// Requests per minute the poller will issue against the availability API
    pub fn requests_per_minute(&self) -> f64 {
        let secs = self.poll_period.as_secs_f64();
        if secs == 0.0 {
            return f64::INFINITY;
        }
        self.targets().len() as f64 * 60.0 / secs
    }

    /// Fill missing client credentials from the environment
    pub fn resolve_secrets(&mut self) -> crate::Result<()> {
        self.resolve_secrets_with(|name| std::env::var(name).ok())
    }

    /// Fill missing client credentials using `lookup` for the variable names
    pub fn resolve_secrets_with<F>(&mut self, lookup: F) -> crate::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.client_id.is_empty() {
            self.client_id = lookup(CLIENT_ID_ENV).unwrap_or_default();
        }
        if self.client_secret.is_empty() {
            self.client_secret = lookup(CLIENT_SECRET_ENV).unwrap_or_default();
        }

        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(crate::SeatWatchError::Config(format!(
                "client_id and client_secret are required; set them in the config file or via {} and {}",
                CLIENT_ID_ENV, CLIENT_SECRET_ENV
            )));
        }
        Ok(())
    }

    /// Check the configuration is runnable and stays within the API rate limit
    pub fn validate(&self) -> crate::Result<()> {
        if self.courses.is_empty() {
            return Err(crate::SeatWatchError::Config(
                "No courses to monitor".to_string(),
            ));
        }
        if self.poll_period.is_zero() {
            return Err(crate::SeatWatchError::Config(
                "poll_period must be greater than zero".to_string(),
            ));
        }
        if self.refresh_period.is_zero() {
            return Err(crate::SeatWatchError::Config(
                "refresh_period must be greater than zero".to_string(),
            ));
        }
        if self.refresh_retry.is_zero() {
            return Err(crate::SeatWatchError::Config(
                "refresh_retry must be greater than zero".to_string(),
            ));
        }
        if self.refresh_period >= self.token_lifetime {
            return Err(crate::SeatWatchError::Config(format!(
                "refresh_period ({}) must be shorter than token_lifetime ({})",
                humantime::format_duration(self.refresh_period),
                humantime::format_duration(self.token_lifetime)
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(crate::SeatWatchError::Config(
                "request_timeout must be greater than zero".to_string(),
            ));
        }
        if self.alert_queue_size == 0 {
            return Err(crate::SeatWatchError::Config(
                "alert_queue_size must be at least 1".to_string(),
            ));
        }

        if self.alerts.is_empty() {
            return Err(crate::SeatWatchError::Config(
                "At least one alert sink must be configured".to_string(),
            ));
        }
        if let AlertReset::Cooldown { after } = self.alert_reset {
            if after.is_zero() {
                return Err(crate::SeatWatchError::Config(
                    "alert_reset cooldown must be greater than zero".to_string(),
                ));
            }
        }
        if self.max_requests_per_minute > API_REQUESTS_PER_MINUTE {
            return Err(crate::SeatWatchError::Config(format!(
                "max_requests_per_minute ({}) exceeds the API limit of {}",
                self.max_requests_per_minute, API_REQUESTS_PER_MINUTE
            )));
        }

        let rate = self.requests_per_minute();
        if rate > f64::from(self.max_requests_per_minute) {
            return Err(crate::SeatWatchError::Config(format!(
                "{} courses every {} is {:.1} requests/minute, above the limit of {}",
                self.targets().len(),
                humantime::format_duration(self.poll_period),
                rate,
                self.max_requests_per_minute
            )));
        }
        if self.request_timeout >= self.poll_period {
            return Err(crate::SeatWatchError::Config(format!(
                "request_timeout ({}) must be shorter than poll_period ({})",
                humantime::format_duration(self.request_timeout),
                humantime::format_duration(self.poll_period)
            )));
        }
        Ok(())
    }
}

fn default_auth_url() -> String {
    "https://api-km.it.umich.edu/token".to_string()
}

fn default_api_base_url() -> String {
    "http://api-gw.it.umich.edu/Curriculum/SOC/v1".to_string()
}

fn default_seats_field() -> String {
    "AvailableSeats".to_string()
}

fn default_refresh_period() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_poll_period() -> Duration {
    Duration::from_millis(200_500)
}

fn default_token_lifetime() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_refresh_retry() -> Duration {
    Duration::from_secs(15)
}

fn default_max_requests_per_minute() -> u32 {
    60
}

fn default_alert_queue_size() -> usize {
    16
}

fn default_alert_history_size() -> usize {
    100
}

fn default_alerts() -> Vec<AlertSinkConfig> {
    vec![AlertSinkConfig::Bell]
}

fn default_pushover_title() -> String {
    "Seat available".to_string()
}

fn default_pushover_sound() -> String {
    "siren".to_string()
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::SeatWatchError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
