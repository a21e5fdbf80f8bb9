//! CLI for this application
//!
use std::time::Duration;

use crate::settings;

pub use crate::settings::{APP_NAME, APP_VERSION};

#[derive(Clone, Debug, clap::Parser)]
#[command(name = "murmur", about = "In-memory chat relay with per-client admission control")]
pub struct Cli {
    // Server listen address
    #[clap(
        long,
        default_value = "127.0.0.1",
        env("MURMUR_LISTEN_ADDRESS"),
        help = "IP Address to listen on"
    )]
    pub listen_address: String,

    // HTTP API listen port
    #[clap(
        long,
        default_value = settings::DEFAULT_PORT_HTTP,
        env("MURMUR_HTTP_LISTEN_PORT"),
        help = "Port to bind the HTTP API server to"
    )]
    pub listen_port: u16,

    // Rate limit settings: token refill rate
    #[clap(
        long,
        default_value = "10",
        env("MURMUR_RATE_LIMIT_PER_SECOND"),
        help = "Tokens added to each client's bucket per second"
    )]
    pub rate_limit_per_second: f64,

    // Rate limit settings: bucket capacity
    #[clap(
        long,
        default_value = "20",
        env("MURMUR_RATE_LIMIT_BURST"),
        help = "Maximum burst of calls a client can make at once"
    )]
    pub rate_limit_burst: u32,

    #[clap(
        long,
        default_value = "60",
        env("MURMUR_RATE_LIMIT_EVICTION_SECONDS"),
        help = "Seconds after creation when a client's bucket is discarded"
    )]
    pub rate_limit_eviction_seconds: u64,

    #[clap(
        long,
        default_value = "30",
        env("MURMUR_RATE_LIMIT_SWEEP_SECONDS"),
        help = "Interval in seconds between sweeps of expired buckets"
    )]
    pub rate_limit_sweep_seconds: u64,

    #[clap(
        long,
        default_value = "100",
        env("MURMUR_INTENT_QUEUE_CAPACITY"),
        help = "Capacity of each join/leave/message queue"
    )]
    pub intent_queue_capacity: usize,

    #[clap(
        long,
        default_value = "3000",
        env("MURMUR_HISTORY_TIMEOUT_MS"),
        help = "Deadline in milliseconds for a history snapshot"
    )]
    pub history_timeout_ms: u64,

    #[clap(
        long,
        default_value = "10",
        env("MURMUR_REQUEST_TIMEOUT_SECONDS"),
        help = "Deadline in seconds for a whole HTTP request"
    )]
    pub request_timeout_seconds: u64,

    #[clap(long, env("MURMUR_LOG_JSON"), help = "Emit logs as JSON")]
    pub log_json: bool,
}

impl Cli {
    pub fn into_settings(self) -> settings::Settings {
        settings::Settings {
            listen_address: self.listen_address,
            listen_port: self.listen_port,
            rate_limit: settings::RateLimitSettings {
                requests_per_second: self.rate_limit_per_second,
                burst: self.rate_limit_burst,
                eviction_delay: Duration::from_secs(self.rate_limit_eviction_seconds),
                sweep_interval: Duration::from_secs(self.rate_limit_sweep_seconds),
            },
            registry: settings::RegistrySettings {
                intent_queue_capacity: self.intent_queue_capacity,
                history_timeout: Duration::from_millis(self.history_timeout_ms),
            },
            request_timeout: Duration::from_secs(self.request_timeout_seconds),
            log_json: self.log_json,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn defaults_match_settings() {
        let cli = Cli::parse_from(["murmur"]);
        let settings = cli.into_settings();
        let defaults = settings::Settings::default();
        assert_eq!(settings.listen_port, defaults.listen_port);
        assert_eq!(settings.rate_limit, defaults.rate_limit);
        assert_eq!(settings.registry, defaults.registry);
        assert!(!settings.log_json);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "murmur",
            "--rate-limit-per-second",
            "2.5",
            "--rate-limit-burst",
            "4",
            "--history-timeout-ms",
            "250",
            "--log-json",
        ]);
        let settings = cli.into_settings();
        assert!((settings.rate_limit.requests_per_second - 2.5).abs() < f64::EPSILON);
        assert_eq!(settings.rate_limit.burst, 4);
        assert_eq!(settings.registry.history_timeout, Duration::from_millis(250));
        assert!(settings.log_json);
    }
}
