//! Integration tests for per-client admission
use std::sync::Arc;
use std::time::Duration;

use murmur::limiters::{Decision, RateLimiter};
use murmur::settings::RateLimitSettings;
use tokio::time;

fn ten_per_second() -> RateLimitSettings {
    RateLimitSettings {
        requests_per_second: 10.0,
        burst: 20,
        eviction_delay: Duration::from_secs(60),
        sweep_interval: Duration::from_secs(30),
    }
}

#[tokio::test(start_paused = true)]
async fn test_burst_then_refill() {
    let limiter = RateLimiter::new(ten_per_second());

    for expected in (0..20).rev() {
        assert_eq!(
            limiter.admit("alice").unwrap(),
            Decision::Allow {
                calls_remaining: expected
            }
        );
    }
    assert_eq!(limiter.admit("alice").unwrap(), Decision::Deny);

    // 150ms at 10/s refills one and a half tokens
    time::advance(Duration::from_millis(150)).await;
    assert!(limiter.admit("alice").unwrap().is_allowed());
    assert_eq!(limiter.admit("alice").unwrap(), Decision::Deny);
}

#[tokio::test(start_paused = true)]
async fn test_clients_do_not_share_buckets() {
    let limiter = RateLimiter::new(ten_per_second());
    for _ in 0..20 {
        limiter.admit("alice").unwrap();
    }
    assert_eq!(limiter.admit("alice").unwrap(), Decision::Deny);
    assert_eq!(
        limiter.admit("bob").unwrap(),
        Decision::Allow {
            calls_remaining: 19
        }
    );
    assert_eq!(limiter.check_calls_remaining_for_client("carol").unwrap(), 20);
}

#[tokio::test(start_paused = true)]
async fn test_bucket_lifetime_is_fixed_from_creation() {
    let limiter = RateLimiter::new(ten_per_second());
    limiter.admit("alice").unwrap();

    // Use at T+59 does not extend the deadline
    time::advance(Duration::from_secs(59)).await;
    assert!(limiter.admit("alice").unwrap().is_allowed());
    assert!(limiter.contains_key("alice").unwrap());

    time::advance(Duration::from_secs(2)).await;
    assert!(!limiter.contains_key("alice").unwrap());
    assert_eq!(
        limiter.admit("alice").unwrap(),
        Decision::Allow {
            calls_remaining: 19
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_expired_bucket_starts_full_even_when_drained() {
    let limiter = RateLimiter::new(ten_per_second());
    for _ in 0..20 {
        limiter.admit("alice").unwrap();
    }
    assert_eq!(limiter.admit("alice").unwrap(), Decision::Deny);

    time::advance(Duration::from_secs(60)).await;
    assert_eq!(
        limiter.admit("alice").unwrap(),
        Decision::Allow {
            calls_remaining: 19
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_sweep_only_removes_expired_buckets() {
    let limiter = RateLimiter::new(ten_per_second());
    limiter.admit("early").unwrap();
    time::advance(Duration::from_secs(30)).await;
    limiter.admit("late").unwrap();
    time::advance(Duration::from_secs(31)).await;

    assert_eq!(limiter.bucket_count().unwrap(), 2);
    assert_eq!(limiter.expire_keys().unwrap(), 1);
    assert!(!limiter.contains_key("early").unwrap());
    assert!(limiter.contains_key("late").unwrap());
}

#[tokio::test]
async fn test_concurrent_admission_never_overdraws() {
    let settings = RateLimitSettings {
        requests_per_second: 0.001,
        burst: 50,
        ..ten_per_second()
    };
    let limiter = Arc::new(RateLimiter::new(settings));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let limiter = limiter.clone();
        handles.push(tokio::spawn(async move {
            let mut allowed = 0;
            for _ in 0..25 {
                if limiter.admit("shared").unwrap().is_allowed() {
                    allowed += 1;
                }
                tokio::task::yield_now().await;
            }
            allowed
        }));
    }

    let mut total = 0;
    for handle in handles {
        total += handle.await.unwrap();
    }
    assert_eq!(total, 50);
}
