use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::{to_bytes, Body, Bytes};
use axum::extract::Request;
use axum::http::response;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tower_layer::Layer;
use tower_service::Service;
use tracing::{info, warn};

use super::{LogEntry, LogSink};
use crate::limiters::client_key;
use crate::validation_error;

/// Largest request body the interceptor will buffer
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Wraps a service so every call produces exactly one `LogEntry`
#[derive(Clone)]
pub struct RecordLayer {
    sink: Arc<dyn LogSink>,
}

impl RecordLayer {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }
}

impl<S> Layer<S> for RecordLayer {
    type Service = RecordService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RecordService {
            inner,
            sink: self.sink.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RecordService<S> {
    inner: S,
    sink: Arc<dyn LogSink>,
}

impl<S> Service<Request> for RecordService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // keep the instance that was driven to readiness
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let sink = self.sink.clone();

        Box::pin(async move {
            let start_time = Utc::now();
            let started = Instant::now();

            let (parts, body) = request.into_parts();
            let (body, early_response) = match to_bytes(body, MAX_BODY_BYTES).await {
                Ok(bytes) => (bytes, None),
                Err(err) => (
                    Bytes::new(),
                    Some(
                        validation_error!("Request body could not be read: {}", err)
                            .into_response(),
                    ),
                ),
            };
            let client_id = client_key(&parts.method, &parts.uri, &body);
            let pending = PendingRecord {
                entry: Some(LogEntry::from_request(&parts, &body, client_id, start_time)),
                sink,
                started,
            };

            let response = match early_response {
                Some(response) => response,
                None => {
                    inner
                        .call(Request::from_parts(parts, Body::from(body)))
                        .await?
                }
            };

            let (parts, body) = response.into_parts();
            let body = to_bytes(body, usize::MAX).await.unwrap_or_else(|err| {
                warn!("Failed to capture response body: {}", err);
                Bytes::new()
            });
            pending.complete(&parts, &body);

            Ok(Response::from_parts(parts, Body::from(body)))
        })
    }
}

/// Owns the entry until the call finishes. If the call future is dropped
/// first, the entry is recorded on drop with no response half.
struct PendingRecord {
    entry: Option<LogEntry>,
    sink: Arc<dyn LogSink>,
    started: Instant,
}

impl PendingRecord {
    fn complete(mut self, parts: &response::Parts, body: &[u8]) {
        if let Some(mut entry) = self.entry.take() {
            entry.complete(parts, body, self.started.elapsed());
            self.emit(entry);
        }
    }

    fn emit(&self, entry: LogEntry) {
        info!(
            target: "murmur::request_log",
            client_id = entry.client_id.as_ref().map(|id| id.as_str()),
            method = %entry.method,
            url = %entry.request_url,
            status = entry.status_code,
            duration_ms = entry.response_duration_ms,
            "request completed"
        );
        self.sink.record(entry);
    }
}

impl Drop for PendingRecord {
    fn drop(&mut self) {
        if let Some(mut entry) = self.entry.take() {
            entry.abandon(self.started.elapsed());
            warn!(
                target: "murmur::request_log",
                url = %entry.request_url,
                "request abandoned before a response was produced"
            );
            self.emit(entry);
        }
    }
}
