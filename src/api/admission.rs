//! Per-client admission gate for the room routes
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::{debug, event, Level};

use super::state::AppState;
use crate::error::{MurmurError, Result};
use crate::intercept::MAX_BODY_BYTES;
use crate::limiters::{client_key, Decision};
use crate::validation_error;

pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Charges the call to the client it names. Calls that name no client are
/// rejected before reaching the limiter; denied calls never reach the handler.
pub async fn admit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|err| validation_error!("Request body could not be read: {}", err))?;

    let client_id = client_key(&parts.method, &parts.uri, &body)
        .ok_or_else(|| validation_error!("Client ID is required for rate limiting."))?;

    let decision = state.limiter.admit(client_id.as_str()).map_err(|err| {
        event!(
            Level::ERROR,
            message = "Failed limiting client",
            err = format!("{:?}", err)
        );
        err
    })?;

    match decision {
        Decision::Allow { calls_remaining } => {
            let request = Request::from_parts(parts, Body::from(body));
            let mut response = next.run(request).await;
            response
                .headers_mut()
                .insert(RATE_LIMIT_REMAINING, HeaderValue::from(calls_remaining));
            Ok(response)
        }
        Decision::Deny => {
            debug!(client_id = %client_id, "admission denied");
            Err(MurmurError::AdmissionDenied(client_id))
        }
    }
}
