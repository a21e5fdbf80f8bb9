//! Token bucket rate limiting algorithm
use std::sync::Mutex;

use tokio::time::{Duration, Instant};

use crate::error::Result;
use crate::internal_error;
use crate::settings;

/// Mutable part of a bucket, guarded by the bucket's own lock
#[derive(Clone, Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Continuous-refill token bucket for a single client.
///
/// Tokens accrue at `refill_rate` per second up to `capacity`. Each admitted
/// call takes one whole token. The bucket is shared between concurrent calls
/// for the same client, so all arithmetic happens under its own mutex.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    created_at: Instant,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// A fresh bucket starts full
    pub fn new(rate_limit_settings: &settings::RateLimitSettings) -> Self {
        Self::new_at(rate_limit_settings, Instant::now())
    }

    pub fn new_at(rate_limit_settings: &settings::RateLimitSettings, now: Instant) -> Self {
        let capacity = f64::from(rate_limit_settings.burst);
        Self {
            capacity,
            refill_rate: rate_limit_settings.token_rate_seconds(),
            created_at: now,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: now,
            }),
        }
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Buckets live for a fixed span from creation; use does not extend it
    pub fn is_expired(&self, eviction_delay: Duration, now: Instant) -> bool {
        now >= self.created_at + eviction_delay
    }

    /// Refill for elapsed time, then take a token if one is available.
    /// Returns Some(remaining_tokens) if allowed, None if rate limited
    pub fn try_acquire(&self) -> Result<Option<u32>> {
        self.try_acquire_at(Instant::now())
    }

    pub fn try_acquire_at(&self, now: Instant) -> Result<Option<u32>> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| internal_error!("Failed to acquire bucket lock: {}", e))?;
        self.refill(&mut state, now);
        if state.tokens >= 1f64 {
            state.tokens -= 1f64;
            Ok(Some(tokens_to_u32(state.tokens)))
        } else {
            Ok(None)
        }
    }

    /// Whole tokens available right now, without consuming any
    pub fn tokens_remaining(&self) -> Result<u32> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| internal_error!("Failed to acquire bucket lock: {}", e))?;
        self.refill(&mut state, Instant::now());
        Ok(tokens_to_u32(state.tokens))
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        // `now` can trail `last_refill` when a caller sampled the clock
        // before another caller updated the bucket
        let elapsed = now.saturating_duration_since(state.last_refill);
        if elapsed.is_zero() {
            return;
        }
        let tokens_to_add = self.refill_rate * elapsed.as_secs_f64();
        state.tokens = (state.tokens + tokens_to_add).clamp(0.0, self.capacity);
        state.last_refill = now;
    }
}

/// Return number of tokens as u32, clamped to u32 range
fn tokens_to_u32(tokens: f64) -> u32 {
    tokens.trunc().clamp(0.0, u32::MAX.into()) as u32
}
