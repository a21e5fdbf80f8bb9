//! Which client a request is charged to
use axum::extract::Query;
use axum::http::{Method, Uri};
use serde::Deserialize;

use crate::room::ClientId;

#[derive(Debug, Deserialize)]
struct KeyPayload {
    #[serde(rename = "clientID")]
    client_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeyQuery {
    id: Option<String>,
}

/// State-changing calls carry the id in their JSON body as `clientID`;
/// read-only calls carry it in the `id` query parameter. Returns None when
/// the id is missing, blank, or the body is not the expected JSON.
pub fn client_key(method: &Method, uri: &Uri, body: &[u8]) -> Option<ClientId> {
    let raw = if method.is_safe() {
        Query::<KeyQuery>::try_from_uri(uri).ok()?.0.id
    } else {
        serde_json::from_slice::<KeyPayload>(body).ok()?.client_id
    };
    raw.and_then(|id| ClientId::parse(id).ok())
}
