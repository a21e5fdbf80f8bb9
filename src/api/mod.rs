mod admission;
mod base;
mod logs;
mod room;

use std::borrow::Cow;

use axum::{
    error_handling::HandleErrorLayer, http::StatusCode, middleware, response::IntoResponse,
    routing, Router,
};
use tower::{BoxError, ServiceBuilder};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod paths;
pub mod state;

pub use admission::RATE_LIMIT_REMAINING;
pub use base::{AboutResponse, PingResponse};
pub use room::{AckResponse, RoomRequest};
pub use state::AppState;

use crate::error::Result;
use crate::intercept::RecordLayer;

/// Build the chat API. Room routes are recorded by the interceptor and gated
/// by the per-client rate limiter; the rest are open.
///
/// Only the open routes carry the request timeout. Room calls block on a
/// full intent queue instead of failing, and history has its own deadline.
pub async fn api(state: AppState) -> Result<Router> {
    // Recording wraps admission so refused calls are recorded too
    let room_routes = Router::new()
        .route(paths::room::JOIN, routing::post(room::join))
        .route(paths::room::LEAVE, routing::post(room::leave))
        .route(paths::room::SEND, routing::post(room::send))
        .route(paths::room::MESSAGES, routing::get(room::messages))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admission::admit,
        ))
        .route_layer(RecordLayer::new(state.logs.clone()));

    let open_routes = Router::new()
        .route(paths::base::ROOT, routing::get(base::root))
        .route(paths::base::HEALTH, routing::get(base::health))
        .route(paths::base::ABOUT, routing::get(base::about))
        .route(paths::base::PING, routing::get(base::ping))
        .route(paths::LOGS, routing::get(logs::logs))
        .layer(
            ServiceBuilder::new()
                // Handle errors from middleware
                .layer(HandleErrorLayer::new(handle_error))
                .load_shed()
                .timeout(state.request_timeout),
        );

    let api = open_routes
        .merge(room_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    Ok(api)
}

async fn handle_error(error: BoxError) -> impl IntoResponse {
    if error.is::<tower::timeout::error::Elapsed>() {
        return (StatusCode::REQUEST_TIMEOUT, Cow::from("request timed out"));
    }

    if error.is::<tower::load_shed::error::Overloaded>() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Cow::from("service is overloaded, try again later"),
        );
    }

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Cow::from(format!("Unhandled internal error: {}", error)),
    )
}
