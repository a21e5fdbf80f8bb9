use std::sync::Arc;
use std::time::Duration;

use crate::intercept::MemoryLogSink;
use crate::limiters::RateLimiter;
use crate::room::ClientRegistry;
use crate::settings::Settings;

/// Shared by every handler. Cloning is cheap: all members are behind `Arc`.
#[derive(Clone, Debug)]
pub struct AppState {
    pub registry: Arc<ClientRegistry>,
    pub limiter: Arc<RateLimiter>,
    pub logs: Arc<MemoryLogSink>,
    pub request_timeout: Duration,
}

impl AppState {
    /// Spawns the registry loop, so this must run inside a tokio runtime
    pub fn new(settings: &Settings) -> Self {
        Self {
            registry: Arc::new(ClientRegistry::new(settings.registry_settings())),
            limiter: Arc::new(RateLimiter::new(settings.rate_limit_settings())),
            logs: Arc::new(MemoryLogSink::new()),
            request_timeout: settings.request_timeout,
        }
    }
}
