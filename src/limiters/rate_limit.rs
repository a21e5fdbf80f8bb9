use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info};

use super::token_bucket::TokenBucket;
use crate::error::Result;
use crate::internal_error;
use crate::settings;

/// Outcome of an admission check
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "decision")]
pub enum Decision {
    Allow { calls_remaining: u32 },
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }
}

/// Per-client admission gate.
///
/// Buckets are created lazily on the first call for a key and live for a
/// fixed `eviction_delay` from creation. A bucket past its deadline is treated
/// as absent: the next call for that key gets a fresh, full bucket. Expired
/// entries are also reclaimed by `expire_keys`, which `spawn_sweeper` runs on
/// an interval so the table does not grow with every client ever seen.
///
/// The table lock is held only for lookup, insert and delete. Token
/// arithmetic happens on the bucket itself, outside the table lock.
#[derive(Debug)]
pub struct RateLimiter {
    settings: settings::RateLimitSettings,
    cache: Mutex<HashMap<String, Arc<TokenBucket>>>,
}

impl RateLimiter {
    pub fn new(rate_limit_settings: settings::RateLimitSettings) -> Self {
        Self {
            settings: rate_limit_settings,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_settings(&self) -> &settings::RateLimitSettings {
        &self.settings
    }

    fn table(&self) -> Result<MutexGuard<'_, HashMap<String, Arc<TokenBucket>>>> {
        self.cache
            .lock()
            .map_err(|e| internal_error!("Failed to acquire rate_limiter lock: {}", e))
    }

    /// Return the live bucket for `key`, creating one if none exists or the
    /// existing one has reached its deadline
    pub fn get_or_create(&self, key: &str) -> Result<Arc<TokenBucket>> {
        self.get_or_create_at(key, Instant::now())
    }

    fn get_or_create_at(&self, key: &str, now: Instant) -> Result<Arc<TokenBucket>> {
        let mut table = self.table()?;
        if let Some(bucket) = table.get(key) {
            if !bucket.is_expired(self.settings.eviction_delay, now) {
                return Ok(bucket.clone());
            }
            debug!(client_id = key, "Replacing expired rate limit bucket");
        }
        let bucket = Arc::new(TokenBucket::new_at(&self.settings, now));
        table.insert(key.to_string(), bucket.clone());
        Ok(bucket)
    }

    /// Check rate limit and take a token if the call is allowed
    pub fn admit(&self, key: &str) -> Result<Decision> {
        let now = Instant::now();
        let bucket = self.get_or_create_at(key, now)?;
        let decision = match bucket.try_acquire_at(now)? {
            Some(calls_remaining) => Decision::Allow { calls_remaining },
            None => Decision::Deny,
        };
        Ok(decision)
    }

    /// Return actual calls remaining or the full burst for unseen keys
    pub fn check_calls_remaining_for_client(&self, key: &str) -> Result<u32> {
        let bucket = {
            let table = self.table()?;
            table
                .get(key)
                .filter(|b| !b.is_expired(self.settings.eviction_delay, Instant::now()))
                .cloned()
        };
        match bucket {
            Some(bucket) => bucket.tokens_remaining(),
            None => Ok(self.settings.burst),
        }
    }

    /// Whether `key` currently has a live bucket
    pub fn contains_key(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        Ok(self
            .table()?
            .get(key)
            .is_some_and(|b| !b.is_expired(self.settings.eviction_delay, now)))
    }

    /// Number of entries in the table, including expired ones not yet swept
    pub fn bucket_count(&self) -> Result<usize> {
        Ok(self.table()?.len())
    }

    /// Drop every bucket past its deadline. Returns how many were removed
    pub fn expire_keys(&self) -> Result<usize> {
        let now = Instant::now();
        let delay = self.settings.eviction_delay;
        let mut table = self.table()?;
        let before = table.len();
        table.retain(|_k, bucket| !bucket.is_expired(delay, now));
        Ok(before - table.len())
    }

    /// Run `expire_keys` every `sweep_interval` until the handle is aborted
    pub fn spawn_sweeper(self: Arc<Self>) -> JoinHandle<()> {
        let period = self.settings.sweep_interval;
        info!(
            "Starting rate limit sweeper with {}s interval",
            period.as_secs_f64()
        );
        tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match self.expire_keys() {
                    Ok(0) => {}
                    Ok(removed) => debug!("Swept {} expired rate limit buckets", removed),
                    Err(e) => tracing::error!("Rate limit sweep failed: {}", e),
                }
            }
        })
    }
}
