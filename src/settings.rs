//! murmur application settings
use std::time::Duration;

use crate::config_error;
use crate::error::Result;

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const STANDARD_PORT_HTTP: u16 = 9000;
pub const DEFAULT_PORT_HTTP: &str = "9000";

/// Token bucket parameters shared by every per-client bucket
#[derive(Clone, Debug, PartialEq)]
pub struct RateLimitSettings {
    /// Tokens added per second
    pub requests_per_second: f64,
    /// Bucket capacity and starting token count
    pub burst: u32,
    /// Fixed lifetime of a bucket measured from its creation
    pub eviction_delay: Duration,
    /// How often expired buckets are swept from the table
    pub sweep_interval: Duration,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests_per_second: 10.0,
            burst: 20,
            eviction_delay: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(30),
        }
    }
}

impl RateLimitSettings {
    pub fn token_rate_seconds(&self) -> f64 {
        self.requests_per_second
    }
}

/// Sizing for the registry actor
#[derive(Clone, Debug, PartialEq)]
pub struct RegistrySettings {
    /// Capacity of each intent queue (join, leave, message)
    pub intent_queue_capacity: usize,
    /// Deadline for a history snapshot
    pub history_timeout: Duration,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            intent_queue_capacity: 100,
            history_timeout: Duration::from_secs(3),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    // Server listen address
    pub listen_address: String,

    // HTTP API listen port
    pub listen_port: u16,

    pub rate_limit: RateLimitSettings,
    pub registry: RegistrySettings,

    // Overall deadline for a single HTTP request
    pub request_timeout: Duration,

    pub log_json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1".to_string(),
            listen_port: STANDARD_PORT_HTTP,
            rate_limit: RateLimitSettings::default(),
            registry: RegistrySettings::default(),
            request_timeout: Duration::from_secs(10),
            log_json: false,
        }
    }
}

impl Settings {
    pub fn rate_limit_settings(&self) -> RateLimitSettings {
        self.rate_limit.clone()
    }

    pub fn registry_settings(&self) -> RegistrySettings {
        self.registry.clone()
    }

    /// Reject values that would make the limiter or the registry unusable
    pub fn validate(&self) -> Result<()> {
        let rl = &self.rate_limit;
        if !rl.requests_per_second.is_finite() || rl.requests_per_second <= 0.0 {
            return Err(config_error!(
                "rate limit must be a positive number, got {}",
                rl.requests_per_second
            ));
        }
        if rl.burst == 0 {
            return Err(config_error!("rate limit burst must be at least 1"));
        }
        if rl.eviction_delay.is_zero() {
            return Err(config_error!("bucket eviction delay must be non-zero"));
        }
        if rl.sweep_interval.is_zero() {
            return Err(config_error!("bucket sweep interval must be non-zero"));
        }
        if self.registry.intent_queue_capacity == 0 {
            return Err(config_error!("intent queue capacity must be at least 1"));
        }
        if self.registry.history_timeout.is_zero() {
            return Err(config_error!("history timeout must be non-zero"));
        }
        Ok(())
    }
}
