use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{event, instrument, Level};

use super::state::AppState;
use crate::error::{MurmurError, Result};
use crate::room::{ClientId, HistoryResponse, IntentKind, NewMessage};
use crate::validation_error;

/// Body of `/join`, `/leave` and `/send`
#[derive(Debug, Default, Deserialize)]
pub struct RoomRequest {
    #[serde(rename = "clientID", default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AckResponse {
    pub message: String,
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
}

impl AckResponse {
    fn new(intent: IntentKind, client_id: ClientId) -> Self {
        let message = match intent {
            IntentKind::Join => "User joined successfully",
            IntentKind::Leave => "User left successfully",
            IntentKind::Message => "Message sent successfully",
        };
        Self {
            message: message.to_string(),
            client_id,
        }
    }
}

fn parse_request(body: &Bytes) -> Result<RoomRequest> {
    if body.is_empty() {
        return Ok(RoomRequest::default());
    }
    serde_json::from_slice(body).map_err(|err| validation_error!("Invalid request body: {}", err))
}

fn required_client(raw: Option<String>) -> Result<ClientId> {
    ClientId::parse(raw.unwrap_or_default())
}

fn log_failure(action: &str, err: &MurmurError) {
    if err.is_domain_outcome() {
        event!(Level::DEBUG, message = action, err = %err);
    } else {
        event!(Level::ERROR, message = action, err = format!("{:?}", err));
    }
}

#[instrument(skip(state), level = "debug")]
pub async fn join(State(state): State<AppState>, body: Bytes) -> Result<Json<AckResponse>> {
    let client_id = required_client(parse_request(&body)?.client_id)?;
    let accepted = state
        .registry
        .request_join(client_id)
        .await
        .inspect_err(|err| log_failure("Failed joining client", err))?;
    Ok(Json(AckResponse::new(accepted.intent, accepted.client_id)))
}

#[instrument(skip(state), level = "debug")]
pub async fn leave(State(state): State<AppState>, body: Bytes) -> Result<Json<AckResponse>> {
    let client_id = required_client(parse_request(&body)?.client_id)?;
    let accepted = state
        .registry
        .request_leave(client_id)
        .await
        .inspect_err(|err| log_failure("Failed removing client", err))?;
    Ok(Json(AckResponse::new(accepted.intent, accepted.client_id)))
}

#[instrument(skip(state), level = "debug")]
pub async fn send(State(state): State<AppState>, body: Bytes) -> Result<Json<AckResponse>> {
    let request = parse_request(&body)?;
    let client_id = required_client(request.client_id)?;
    let message = NewMessage::new(client_id, request.message.unwrap_or_default())?;
    let accepted = state
        .registry
        .request_message(message)
        .await
        .inspect_err(|err| log_failure("Failed sending message", err))?;
    Ok(Json(AckResponse::new(accepted.intent, accepted.client_id)))
}

#[instrument(skip(state), level = "debug")]
pub async fn messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<HistoryResponse>> {
    let client_id = required_client(query.id)?;
    state
        .registry
        .fetch_history(client_id)
        .await
        .inspect_err(|err| log_failure("Failed fetching history", err))
        .map(Json)
}
